//! Comms subsystem: the interactive session loop.
//!
//! One turn at a time: acquire input (typed line, or transcript behind the
//! wake-word gate), route to a model tier, pull context from memory, answer,
//! speak, remember. Ctrl-C cancels the shared token and the loop unwinds.

pub mod console;
pub mod voice;

use std::time::{Duration, Instant};

use tokio::io::AsyncBufRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::VoiceConfig;
use crate::subsystems::agents::{FridayAgent, Tier};
use crate::subsystems::memory::MemoryManager;
use console::Console;
use voice::{Listener, Speaker, WakeGate};

pub const MODE_PROMPT: &str = "Choose mode: 'v' for voice or 't' for text: ";
pub const GREETING: &str = "Initializing Friday AI. Say my name to activate.";
const GOODBYE: &str = "Goodbye! Shutting down.";
const WAKE_ACK: &str = "I'm here. I'll stay active for the next minute.";
const POWERFUL_ACK: &str = "Okay, this requires a more detailed answer.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Voice,
    Text,
}

impl Mode {
    /// Answer to [`MODE_PROMPT`]: `v` selects voice, anything else text.
    pub fn from_choice(choice: &str) -> Self {
        if choice.trim().eq_ignore_ascii_case("v") {
            Mode::Voice
        } else {
            Mode::Text
        }
    }

    /// Value of the `-m` flag.
    pub fn from_flag(flag: &str) -> Option<Self> {
        match flag.trim().to_lowercase().as_str() {
            "v" | "voice" => Some(Mode::Voice),
            "t" | "text" => Some(Mode::Text),
            _ => None,
        }
    }
}

pub fn is_exit_command(input: &str) -> bool {
    input.contains("exit") || input.contains("quit")
}

pub fn compose_agent_input(context: &str, query: &str) -> String {
    format!("Relevant context from past conversations:\n{context}\n\nUser's current query: {query}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Exit,
    Skipped,
    Answered(String),
}

pub struct Session<R> {
    agent: FridayAgent,
    memory: MemoryManager,
    speaker: Speaker,
    listener: Listener,
    gate: WakeGate,
    console: Console<R>,
    mode: Mode,
    name: String,
}

impl<R: AsyncBufRead + Unpin> Session<R> {
    pub fn new(
        agent: FridayAgent,
        memory: MemoryManager,
        console: Console<R>,
        voice: &VoiceConfig,
        assistant_name: &str,
        mode: Mode,
    ) -> Self {
        Self {
            agent,
            memory,
            speaker: Speaker::new(assistant_name, voice, mode == Mode::Voice),
            listener: Listener::new(voice),
            gate: WakeGate::new(&voice.wake_word, Duration::from_secs(voice.active_window_seconds)),
            console,
            mode,
            name: assistant_name.to_string(),
        }
    }

    pub fn memory(&self) -> &MemoryManager {
        &self.memory
    }

    /// Run until exit/quit, end of input, or `shutdown`.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        info!(mode = ?self.mode, "session started");
        while !shutdown.is_cancelled() {
            let Some(input) = self.next_input(&shutdown).await else {
                break;
            };
            match self.handle_turn(&input).await {
                TurnOutcome::Exit => break,
                TurnOutcome::Skipped => {}
                TurnOutcome::Answered(_) => self.gate.touch(Instant::now()),
            }
        }
        info!("session ended");
    }

    /// `None` ends the session; `Some("")` skips the turn.
    async fn next_input(&mut self, shutdown: &CancellationToken) -> Option<String> {
        match self.mode {
            Mode::Text => self
                .console
                .read_line("You: ", shutdown)
                .await
                .map(|line| line.trim().to_lowercase()),
            Mode::Voice => {
                let now = Instant::now();
                if let Some(left) = self.gate.remaining(now) {
                    println!("\n{} is active (timeout in {}s). Speak your command:", self.name, left.as_secs());
                    return self.listen(shutdown).await;
                }
                println!("\nListening for wake word '{}'...", self.gate.wake_word());
                let heard = self.listen(shutdown).await?;
                if !self.gate.heard(&heard, Instant::now()) {
                    return Some(String::new());
                }
                self.speaker.speak(WAKE_ACK).await;
                println!("Listening for your command...");
                self.listen(shutdown).await
            }
        }
    }

    async fn listen(&self, shutdown: &CancellationToken) -> Option<String> {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => None,
            text = self.listener.listen() => Some(text),
        }
    }

    /// Process one already-normalized input.
    pub async fn handle_turn(&mut self, input: &str) -> TurnOutcome {
        if is_exit_command(input) {
            self.speaker.speak(GOODBYE).await;
            return TurnOutcome::Exit;
        }
        if input.is_empty() {
            return TurnOutcome::Skipped;
        }

        let tier = self.agent.select_tier(input).await;
        if tier == Tier::Powerful {
            println!("[system] using {} (powerful model)", self.agent.provider(tier).model());
            self.speaker.speak(POWERFUL_ACK).await;
        }

        let context = self.memory.retrieve_context(input).await;
        let agent_input = compose_agent_input(&context, input);
        debug!(%tier, context_len = context.len(), "answering");

        let answer = self.agent.respond(tier, &agent_input, self.memory.history()).await;
        self.speaker.speak(&answer).await;
        self.memory.save_interaction(input, &answer).await;
        TurnOutcome::Answered(answer)
    }
}
