//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory
//! (or the path given with `-f`), then applies `FRIDAY_WORK_DIR` and
//! `FRIDAY_LOG_LEVEL` env overrides. Credentials are only ever read from the
//! environment, never from TOML.

use std::{
    env,
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Voice-mode configuration (`[voice]`).
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Word that activates the assistant in voice mode.
    pub wake_word: String,
    /// Seconds the assistant stays active after an interaction.
    pub active_window_seconds: u64,
    /// Text-to-speech command; the cleaned utterance is appended as the last argument.
    pub tts_command: Vec<String>,
    /// Speech-to-text command; must print the transcript on stdout.
    pub stt_command: Vec<String>,
}

/// Model names for the two routing tiers (`[llm.models]`).
#[derive(Debug, Clone)]
pub struct ModelTiers {
    pub standard: String,
    pub powerful: String,
}

/// LLM configuration (`[llm]`).
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Which provider is active (`"dummy"`, `"openai"`).
    /// Maps to `default` in `[llm]` TOML.
    pub provider: String,
    /// Base URL of an OpenAI-compatible API; `/chat/completions` and
    /// `/embeddings` are appended.
    pub api_base_url: String,
    pub models: ModelTiers,
    pub temperature: f32,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

/// Which embedder backs the vector store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbedderKind {
    Hashed,
    Remote,
}

/// Memory configuration (`[memory]`).
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Vector store collection name, also the file stem on disk.
    pub collection: String,
    /// Vector store directory (already resolved against `work_dir`).
    pub vector_dir: PathBuf,
    /// Number of past interactions retrieved per turn.
    pub retrieve_k: usize,
    /// Number of turns kept in the short-term conversation buffer.
    pub short_term_turns: usize,
    pub embedder: EmbedderKind,
    pub embedding_model: String,
}

#[derive(Debug, Clone)]
pub struct WeatherConfig {
    pub geocoding_url: String,
    pub forecast_url: String,
    pub ip_lookup_url: String,
}

#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub api_base_url: String,
    pub token_url: String,
}

/// Spotify credentials from `SPOTIFY_CLIENT_ID`, `SPOTIFY_CLIENT_SECRET`
/// and `SPOTIFY_REFRESH_TOKEN`.
#[derive(Debug, Clone)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone)]
pub struct ToolsConfig {
    pub weather: WeatherConfig,
    pub spotify: SpotifyConfig,
}

/// Fully-resolved assistant configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub assistant_name: String,
    /// Working directory for all persistent data (already expanded, no `~`).
    pub work_dir: PathBuf,
    pub log_level: String,
    /// Optional log file (absolute or relative to `work_dir`). `None` logs to stderr.
    pub log_file: Option<PathBuf>,
    pub prompts_dir: PathBuf,
    pub voice: VoiceConfig,
    pub llm: LlmConfig,
    pub memory: MemoryConfig,
    pub tools: ToolsConfig,
    /// API key from `LLM_API_KEY` (or `GEMINI_API_KEYS`). Never sourced from TOML.
    pub llm_api_key: Option<String>,
    pub spotify_credentials: Option<SpotifyCredentials>,
}

// ── Raw TOML shape ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RawConfig {
    assistant: RawAssistant,
    #[serde(default)]
    voice: RawVoice,
    #[serde(default)]
    llm: RawLlm,
    #[serde(default)]
    memory: RawMemory,
    #[serde(default)]
    tools: RawTools,
}

#[derive(Deserialize)]
struct RawAssistant {
    #[serde(default = "default_assistant_name")]
    name: String,
    work_dir: String,
    log_level: String,
    #[serde(default)]
    log_file: Option<String>,
    #[serde(default = "default_prompts_dir")]
    prompts_dir: String,
}

#[derive(Deserialize)]
struct RawVoice {
    #[serde(default = "default_wake_word")]
    wake_word: String,
    #[serde(default = "default_active_window_seconds")]
    active_window_seconds: u64,
    #[serde(default = "default_tts_command")]
    tts_command: Vec<String>,
    #[serde(default = "default_stt_command")]
    stt_command: Vec<String>,
}

impl Default for RawVoice {
    fn default() -> Self {
        Self {
            wake_word: default_wake_word(),
            active_window_seconds: default_active_window_seconds(),
            tts_command: default_tts_command(),
            stt_command: default_stt_command(),
        }
    }
}

#[derive(Deserialize)]
struct RawLlm {
    #[serde(rename = "default", default = "default_llm_provider")]
    provider: String,
    #[serde(default = "default_llm_api_base_url")]
    api_base_url: String,
    #[serde(default)]
    models: RawModels,
    #[serde(default = "default_llm_temperature")]
    temperature: f32,
    #[serde(default = "default_llm_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            api_base_url: default_llm_api_base_url(),
            models: RawModels::default(),
            temperature: default_llm_temperature(),
            timeout_seconds: default_llm_timeout_seconds(),
        }
    }
}

#[derive(Deserialize)]
struct RawModels {
    #[serde(default = "default_standard_model")]
    standard: String,
    #[serde(default = "default_powerful_model")]
    powerful: String,
}

impl Default for RawModels {
    fn default() -> Self {
        Self { standard: default_standard_model(), powerful: default_powerful_model() }
    }
}

#[derive(Deserialize)]
struct RawMemory {
    #[serde(default = "default_collection")]
    collection: String,
    #[serde(default = "default_vector_dir")]
    vector_dir: String,
    #[serde(default = "default_retrieve_k")]
    retrieve_k: usize,
    #[serde(default = "default_short_term_turns")]
    short_term_turns: usize,
    #[serde(default = "default_embedder")]
    embedder: String,
    #[serde(default = "default_embedding_model")]
    embedding_model: String,
}

impl Default for RawMemory {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            vector_dir: default_vector_dir(),
            retrieve_k: default_retrieve_k(),
            short_term_turns: default_short_term_turns(),
            embedder: default_embedder(),
            embedding_model: default_embedding_model(),
        }
    }
}

#[derive(Deserialize, Default)]
struct RawTools {
    #[serde(default)]
    weather: RawWeather,
    #[serde(default)]
    spotify: RawSpotify,
}

#[derive(Deserialize)]
struct RawWeather {
    #[serde(default = "default_geocoding_url")]
    geocoding_url: String,
    #[serde(default = "default_forecast_url")]
    forecast_url: String,
    #[serde(default = "default_ip_lookup_url")]
    ip_lookup_url: String,
}

impl Default for RawWeather {
    fn default() -> Self {
        Self {
            geocoding_url: default_geocoding_url(),
            forecast_url: default_forecast_url(),
            ip_lookup_url: default_ip_lookup_url(),
        }
    }
}

#[derive(Deserialize)]
struct RawSpotify {
    #[serde(default = "default_spotify_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_spotify_token_url")]
    token_url: String,
}

impl Default for RawSpotify {
    fn default() -> Self {
        Self {
            api_base_url: default_spotify_api_base_url(),
            token_url: default_spotify_token_url(),
        }
    }
}

fn default_assistant_name() -> String { "Friday".to_string() }
fn default_prompts_dir() -> String { "config/prompts".to_string() }
fn default_wake_word() -> String { "friday".to_string() }
fn default_active_window_seconds() -> u64 { 60 }
fn default_tts_command() -> Vec<String> { vec!["espeak".to_string()] }
fn default_stt_command() -> Vec<String> { vec!["friday-stt".to_string()] }
fn default_llm_provider() -> String { "openai".to_string() }
fn default_llm_api_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/openai".to_string()
}
fn default_standard_model() -> String { "gemini-2.5-flash".to_string() }
fn default_powerful_model() -> String { "gemini-2.5-pro".to_string() }
fn default_llm_temperature() -> f32 { 0.75 }
fn default_llm_timeout_seconds() -> u64 { 60 }
fn default_collection() -> String { "friday_memory".to_string() }
fn default_vector_dir() -> String { "vector_db".to_string() }
fn default_retrieve_k() -> usize { 3 }
fn default_short_term_turns() -> usize { 20 }
fn default_embedder() -> String { "hashed".to_string() }
fn default_embedding_model() -> String { "text-embedding-004".to_string() }
fn default_geocoding_url() -> String { "https://geocoding-api.open-meteo.com/v1/search".to_string() }
fn default_forecast_url() -> String { "https://api.open-meteo.com/v1/forecast".to_string() }
fn default_ip_lookup_url() -> String { "https://ipinfo.io/json".to_string() }
fn default_spotify_api_base_url() -> String { "https://api.spotify.com/v1".to_string() }
fn default_spotify_token_url() -> String { "https://accounts.spotify.com/api/token".to_string() }

/// Load config from `path` (default `config/default.toml`), then apply
/// env-var overrides and read credentials from the environment.
pub fn load(path: Option<&str>) -> Result<Config, AppError> {
    let work_dir_override = env::var("FRIDAY_WORK_DIR").ok();
    let log_level_override = env::var("FRIDAY_LOG_LEVEL").ok();
    let mut config = load_from(
        Path::new(path.unwrap_or(DEFAULT_CONFIG_PATH)),
        work_dir_override.as_deref(),
        log_level_override.as_deref(),
    )?;

    config.llm_api_key = non_empty_env("LLM_API_KEY").or_else(|| non_empty_env("GEMINI_API_KEYS"));
    config.spotify_credentials = match (
        non_empty_env("SPOTIFY_CLIENT_ID"),
        non_empty_env("SPOTIFY_CLIENT_SECRET"),
        non_empty_env("SPOTIFY_REFRESH_TOKEN"),
    ) {
        (Some(client_id), Some(client_secret), Some(refresh_token)) => Some(SpotifyCredentials {
            client_id,
            client_secret,
            refresh_token,
        }),
        _ => None,
    };
    Ok(config)
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Internal loader: accepts an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars.
/// Credentials are left unset.
pub fn load_from(
    path: &Path,
    work_dir_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let a = parsed.assistant;
    let work_dir = expand_home(work_dir_override.unwrap_or(&a.work_dir));
    let log_level = log_level_override.unwrap_or(&a.log_level).to_string();
    crate::logger::parse_level(&log_level)
        .map_err(|e| AppError::Config(format!("assistant.log_level: {e}")))?;
    let log_file = a.log_file.map(|p| resolve_under(&work_dir, &p));

    let embedder = match parsed.memory.embedder.as_str() {
        "hashed" => EmbedderKind::Hashed,
        "remote" => EmbedderKind::Remote,
        other => {
            return Err(AppError::Config(format!(
                "unknown embedder '{other}' (expected \"hashed\" or \"remote\")"
            )));
        }
    };
    if parsed.memory.retrieve_k == 0 {
        return Err(AppError::Config("memory.retrieve_k must be at least 1".into()));
    }

    Ok(Config {
        assistant_name: a.name,
        log_level,
        log_file,
        prompts_dir: PathBuf::from(a.prompts_dir),
        voice: VoiceConfig {
            wake_word: parsed.voice.wake_word.to_lowercase(),
            active_window_seconds: parsed.voice.active_window_seconds,
            tts_command: parsed.voice.tts_command,
            stt_command: parsed.voice.stt_command,
        },
        llm: LlmConfig {
            provider: parsed.llm.provider,
            api_base_url: parsed.llm.api_base_url.trim_end_matches('/').to_string(),
            models: ModelTiers {
                standard: parsed.llm.models.standard,
                powerful: parsed.llm.models.powerful,
            },
            temperature: parsed.llm.temperature,
            timeout_seconds: parsed.llm.timeout_seconds,
        },
        memory: MemoryConfig {
            collection: parsed.memory.collection,
            vector_dir: resolve_under(&work_dir, &parsed.memory.vector_dir),
            retrieve_k: parsed.memory.retrieve_k,
            short_term_turns: parsed.memory.short_term_turns,
            embedder,
            embedding_model: parsed.memory.embedding_model,
        },
        tools: ToolsConfig {
            weather: WeatherConfig {
                geocoding_url: parsed.tools.weather.geocoding_url,
                forecast_url: parsed.tools.weather.forecast_url,
                ip_lookup_url: parsed.tools.weather.ip_lookup_url,
            },
            spotify: SpotifyConfig {
                api_base_url: parsed.tools.spotify.api_base_url.trim_end_matches('/').to_string(),
                token_url: parsed.tools.spotify.token_url,
            },
        },
        work_dir,
        llm_api_key: None,
        spotify_credentials: None,
    })
}

fn resolve_under(base: &Path, path: &str) -> PathBuf {
    let p = expand_home(path);
    if p.is_absolute() { p } else { base.join(p) }
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    if path == "~"
        && let Some(home) = dirs::home_dir()
    {
        return home;
    }
    PathBuf::from(path)
}
