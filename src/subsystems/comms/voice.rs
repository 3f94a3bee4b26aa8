//! Voice I/O: speech cleanup, external TTS/STT commands, wake-word gate.
//!
//! Both engines are external programs taken from config. TTS receives the
//! cleaned utterance as its last argument; STT must print the transcript on
//! stdout and exit.

use std::sync::LazyLock;
use std::time::{Duration, Instant};

use regex::Regex;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::VoiceConfig;
use crate::error::AppError;

static EMOJI: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(concat!(
        "[",
        r"\x{1F600}-\x{1F64F}",
        r"\x{1F300}-\x{1F5FF}",
        r"\x{1F680}-\x{1F6FF}",
        r"\x{1F1E0}-\x{1F1FF}",
        r"\x{1F900}-\x{1F9FF}",
        r"\x{2600}-\x{26FF}",
        r"\x{2702}-\x{27B0}",
        r"\x{24C2}",
        r"\x{1F170}-\x{1F251}",
        r"\x{FE0F}\x{200D}",
        "]+"
    ))
});
static MARKUP: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| Regex::new(r"[*_`]+"));
static SPACES: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| Regex::new(r"\s+"));

/// Strip emoji and markdown emphasis, collapse whitespace.
pub fn clean_for_speech(text: &str) -> String {
    let mut out = text.to_string();
    for re in [&*EMOJI, &*MARKUP].into_iter().flatten() {
        out = re.replace_all(&out, "").into_owned();
    }
    match &*SPACES {
        Ok(re) => re.replace_all(&out, " ").trim().to_string(),
        Err(_) => out.split_whitespace().collect::<Vec<_>>().join(" "),
    }
}

/// Prints every utterance; in voice mode also reads it aloud.
pub struct Speaker {
    name: String,
    tts_command: Vec<String>,
    voice: bool,
}

impl Speaker {
    pub fn new(name: impl Into<String>, config: &VoiceConfig, voice: bool) -> Self {
        Self { name: name.into(), tts_command: config.tts_command.clone(), voice }
    }

    pub fn voice_enabled(&self) -> bool {
        self.voice
    }

    pub async fn speak(&self, text: &str) {
        println!("{}: {text}", self.name);
        if !self.voice {
            return;
        }
        let clean = clean_for_speech(text);
        if clean.is_empty() {
            return;
        }
        if let Err(e) = self.run_tts(&clean).await {
            warn!(error = %e, "text-to-speech failed");
        }
    }

    async fn run_tts(&self, text: &str) -> Result<(), AppError> {
        let (program, args) = self
            .tts_command
            .split_first()
            .ok_or_else(|| AppError::Speech("tts_command is empty".into()))?;
        let status = Command::new(program).args(args).arg(text).status().await?;
        if !status.success() {
            return Err(AppError::Speech(format!("{program} exited with {status}")));
        }
        Ok(())
    }
}

/// Runs the speech-to-text command once per utterance.
pub struct Listener {
    stt_command: Vec<String>,
}

impl Listener {
    pub fn new(config: &VoiceConfig) -> Self {
        Self { stt_command: config.stt_command.clone() }
    }

    /// Lowercased transcript, or `""` when recognition fails.
    pub async fn listen(&self) -> String {
        match self.run_stt().await {
            Ok(text) => {
                let text = text.trim().to_lowercase();
                if !text.is_empty() {
                    println!("You: {text}");
                }
                text
            }
            Err(e) => {
                debug!(error = %e, "speech recognition produced nothing");
                String::new()
            }
        }
    }

    async fn run_stt(&self) -> Result<String, AppError> {
        let (program, args) = self
            .stt_command
            .split_first()
            .ok_or_else(|| AppError::Speech("stt_command is empty".into()))?;
        let output = Command::new(program).args(args).output().await?;
        if !output.status.success() {
            return Err(AppError::Speech(format!("{program} exited with {}", output.status)));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Wake-word gate: after the wake word is heard, further commands are
/// accepted without it until `window` passes with no interaction.
#[derive(Debug, Clone)]
pub struct WakeGate {
    wake_word: String,
    window: Duration,
    last_active: Option<Instant>,
}

impl WakeGate {
    pub fn new(wake_word: &str, window: Duration) -> Self {
        Self { wake_word: wake_word.to_lowercase(), window, last_active: None }
    }

    pub fn wake_word(&self) -> &str {
        &self.wake_word
    }

    pub fn is_active(&self, now: Instant) -> bool {
        self.remaining(now).is_some()
    }

    /// Time left in the active window.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        let since = now.checked_duration_since(self.last_active?)?;
        self.window.checked_sub(since).filter(|d| !d.is_zero())
    }

    /// Check a heard phrase for the wake word; a hit opens the window.
    pub fn heard(&mut self, phrase: &str, now: Instant) -> bool {
        let hit = !self.wake_word.is_empty() && phrase.to_lowercase().contains(&self.wake_word);
        if hit {
            self.last_active = Some(now);
        }
        hit
    }

    /// Restart the window after an interaction.
    pub fn touch(&mut self, now: Instant) {
        self.last_active = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleanup_strips_emoji_and_markup() {
        assert_eq!(clean_for_speech("**Hello** there 😀 `code`"), "Hello there code");
        assert_eq!(clean_for_speech("snake_case   and\n\tnewlines 🚀"), "snakecase and newlines");
    }

    #[test]
    fn cleanup_of_only_symbols_is_empty() {
        assert_eq!(clean_for_speech(" 😀 ** __ "), "");
    }

    #[test]
    fn cleanup_keeps_plain_text() {
        assert_eq!(clean_for_speech("It is 18°C in Paris."), "It is 18°C in Paris.");
    }

    #[test]
    fn gate_starts_closed() {
        let g = WakeGate::new("friday", Duration::from_secs(60));
        assert!(!g.is_active(Instant::now()));
    }

    #[test]
    fn wake_word_opens_window_until_timeout() {
        let mut g = WakeGate::new("Friday", Duration::from_secs(60));
        let t0 = Instant::now();
        assert!(!g.heard("hello there", t0));
        assert!(g.heard("hey FRIDAY", t0));
        assert!(g.is_active(t0 + Duration::from_secs(59)));
        assert!(!g.is_active(t0 + Duration::from_secs(60)));
    }

    #[test]
    fn touch_extends_window() {
        let mut g = WakeGate::new("friday", Duration::from_secs(60));
        let t0 = Instant::now();
        g.touch(t0);
        g.touch(t0 + Duration::from_secs(50));
        assert!(g.is_active(t0 + Duration::from_secs(100)));
        assert_eq!(
            g.remaining(t0 + Duration::from_secs(80)),
            Some(Duration::from_secs(30))
        );
    }

    fn voice_config(tts: &[&str], stt: &[&str]) -> VoiceConfig {
        VoiceConfig {
            wake_word: "friday".into(),
            active_window_seconds: 60,
            tts_command: tts.iter().map(|s| s.to_string()).collect(),
            stt_command: stt.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn missing_stt_program_yields_empty() {
        let l = Listener::new(&voice_config(&[], &["definitely-not-a-stt-binary-9d2"]));
        assert_eq!(l.listen().await, "");
    }

    #[tokio::test]
    async fn empty_stt_command_yields_empty() {
        let l = Listener::new(&voice_config(&[], &[]));
        assert_eq!(l.listen().await, "");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stt_output_is_trimmed_and_lowercased() {
        let l = Listener::new(&voice_config(&[], &["echo", "  What Time Is It "]));
        assert_eq!(l.listen().await, "what time is it");
    }

    #[tokio::test]
    async fn tts_failure_is_swallowed() {
        let s = Speaker::new("Friday", &voice_config(&["definitely-not-a-tts-binary-9d2"], &[]), true);
        s.speak("hello").await;
        assert!(s.voice_enabled());
    }
}
