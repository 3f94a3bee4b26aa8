//! LLM provider implementations.
//!
//! `build(config, model, api_key)` is the factory, called at startup, once
//! per model tier. Adding a new backend = new module + new match arm.

pub mod dummy;
pub mod openai_compatible;
pub mod scripted;

use crate::config::LlmConfig;
use crate::llm::{LlmProvider, ProviderError};

/// Construct an `LlmProvider` for `model` from config and an optional API key.
///
/// `api_key` is sourced from the environment (never TOML). A hosted provider
/// without a key is refused; the caller decides whether to fall back.
pub fn build(
    config: &LlmConfig,
    model: &str,
    api_key: Option<String>,
) -> Result<LlmProvider, ProviderError> {
    match config.provider.as_str() {
        "dummy" => Ok(LlmProvider::Dummy(dummy::DummyProvider)),
        "openai" | "openai-compatible" | "gemini" => {
            if api_key.is_none() && !is_local(&config.api_base_url) {
                return Err(ProviderError::MissingApiKey(config.provider.clone()));
            }
            let p = openai_compatible::OpenAiCompatibleProvider::new(
                config.api_base_url.clone(),
                model.to_string(),
                config.temperature,
                config.timeout_seconds,
                api_key,
            )?;
            Ok(LlmProvider::OpenAiCompatible(p))
        }
        _ => Err(ProviderError::UnknownProvider(config.provider.clone())),
    }
}

fn is_local(url: &str) -> bool {
    url.contains("://localhost") || url.contains("://127.0.0.1")
}
