//! Friday: entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Parse CLI flags, load config
//!   3. Resolve effective log level (CLI `-v` flags > env > config), init logger
//!   4. Build both model tiers (dummy fallback without an API key)
//!   5. Connect Spotify, build the tool registry
//!   6. Open memory (embedder + vector store)
//!   7. Spawn Ctrl-C → shutdown watcher
//!   8. Choose mode, run the session until exit/EOF/shutdown

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use friday::config::{self, Config, EmbedderKind};
use friday::error::AppError;
use friday::llm::providers::{self, dummy::DummyProvider};
use friday::llm::{LlmProvider, ProviderError};
use friday::logger;
use friday::subsystems::agents::FridayAgent;
use friday::subsystems::comms::console::Console;
use friday::subsystems::comms::{GREETING, MODE_PROMPT, Mode, Session};
use friday::subsystems::memory::MemoryManager;
use friday::subsystems::memory::embed::Embedder;
use friday::subsystems::tools::spotify::SpotifyHandle;
use friday::subsystems::tools::standard_registry;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // .env is optional.
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();
    let config = config::load(args.config_path.as_deref())?;

    let effective_log_level = args.log_level.unwrap_or(config.log_level.as_str());
    logger::init(effective_log_level, args.log_level.is_some(), config.log_file.as_deref())?;

    info!(
        name = %config.assistant_name,
        work_dir = %config.work_dir.display(),
        configured_log_level = %config.log_level,
        effective_log_level = %effective_log_level,
        "config loaded"
    );

    let standard = build_provider(&config, &config.llm.models.standard)?;
    let powerful = build_provider(&config, &config.llm.models.powerful)?;

    let spotify = SpotifyHandle::connect(
        config.tools.spotify.clone(),
        config.spotify_credentials.clone(),
    )
    .await;
    let spotify_connected = spotify.is_connected();
    let registry = standard_registry(&config.tools, spotify)
        .map_err(|e| AppError::Config(format!("tool setup failed: {e}")))?;

    let memory = MemoryManager::open(&config.memory, build_embedder(&config))?;

    let shutdown = CancellationToken::new();
    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, initiating shutdown");
            ctrlc_token.cancel();
        }
    });

    let mut console = Console::stdin();
    println!("{}: {GREETING}", config.assistant_name);

    let mode = match args.mode {
        Some(mode) => mode,
        None => match console.read_line(MODE_PROMPT, &shutdown).await {
            Some(choice) => Mode::from_choice(&choice),
            None => return Ok(()),
        },
    };

    print_startup_summary(&config, &standard, &powerful, &registry.names(), spotify_connected, mode);

    let agent = FridayAgent::new(
        standard,
        powerful,
        registry,
        config.prompts_dir.clone(),
        &config.assistant_name,
    );
    let mut session = Session::new(agent, memory, console, &config.voice, &config.assistant_name, mode);
    session.run(shutdown.clone()).await;

    shutdown.cancel();
    let _ = std::io::Write::flush(&mut std::io::stdout());
    Ok(())
}

/// A hosted provider without an API key degrades to the echo provider so the
/// console still works; any other construction failure is fatal.
fn build_provider(config: &Config, model: &str) -> Result<LlmProvider, AppError> {
    match providers::build(&config.llm, model, config.llm_api_key.clone()) {
        Ok(p) => Ok(p),
        Err(ProviderError::MissingApiKey(provider)) => {
            warn!(%provider, %model, "no LLM_API_KEY set; falling back to dummy provider");
            Ok(LlmProvider::Dummy(DummyProvider))
        }
        Err(e) => Err(AppError::Llm(e.to_string())),
    }
}

fn build_embedder(config: &Config) -> Embedder {
    match config.memory.embedder {
        EmbedderKind::Hashed => Embedder::hashed(),
        EmbedderKind::Remote => {
            match providers::build(&config.llm, &config.memory.embedding_model, config.llm_api_key.clone()) {
                Ok(provider) => Embedder::Remote {
                    provider,
                    model: config.memory.embedding_model.clone(),
                },
                Err(e) => {
                    warn!(error = %e, "remote embedder unavailable; using hashed embeddings");
                    Embedder::hashed()
                }
            }
        }
    }
}

fn print_startup_summary(
    config: &Config,
    standard: &LlmProvider,
    powerful: &LlmProvider,
    tools: &[&str],
    spotify_connected: bool,
    mode: Mode,
) {
    let mode_text = match mode {
        Mode::Voice => "voice",
        Mode::Text => "text",
    };
    println!("─────────────────────────────────");
    println!(" {}  (Ctrl-C to quit)", config.assistant_name);
    println!("   mode:    {mode_text}");
    println!("   models:  {} / {}", standard.model(), powerful.model());
    println!("   tools:   {}", tools.join(", "));
    println!("   spotify: {}", if spotify_connected { "connected" } else { "not connected" });
    println!("   memory:  {}", config.memory.vector_dir.display());
    println!("─────────────────────────────────");
}

struct CliArgs {
    log_level: Option<&'static str>,
    config_path: Option<String>,
    mode: Option<Mode>,
}

fn parse_cli_args() -> CliArgs {
    let mut verbosity = 0u8;
    let mut config_path = None;
    let mut mode = None;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: friday [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -f, --config <PATH>        Path to configuration file (default: config/default.toml)");
                println!("  -m, --mode <voice|text>    Skip the mode prompt");
                println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
                std::process::exit(0);
            }
            "-f" | "--config" => {
                if let Some(path) = iter.next() {
                    config_path = Some(path);
                } else {
                    eprintln!("error: -f/--config requires a path argument");
                    std::process::exit(1);
                }
            }
            "-m" | "--mode" => match iter.next().as_deref().and_then(Mode::from_flag) {
                Some(m) => mode = Some(m),
                None => {
                    eprintln!("error: -m/--mode expects 'voice' or 'text'");
                    std::process::exit(1);
                }
            },
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            _ => {}
        }
    }

    CliArgs { log_level: logger::level_for_verbosity(verbosity), config_path, mode }
}
