//! LLM provider abstraction.
//!
//! `LlmProvider` is an enum over concrete provider implementations.
//! Add a new variant + module in `providers/` for each additional backend.
//!
//! Every provider answers with a [`ModelResponse`]: the wire shape is
//! classified once, at the client boundary, so downstream code (the tool
//! dispatcher, the tier router) only ever matches on tagged variants.

pub mod providers;

use serde_json::{Map, Value};
use thiserror::Error;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("provider '{0}' requires LLM_API_KEY")]
    MissingApiKey(String),
    #[error("provider request failed: {0}")]
    Request(String),
}

// ── Response union ────────────────────────────────────────────────────────────

/// A model-requested tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub name: String,
    /// Model-declared argument object, in declaration order.
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self { name: name.into(), arguments }
    }

    /// Convenience for the common `{"input": "..."}` shape.
    pub fn with_input(name: impl Into<String>, input: impl Into<String>) -> Self {
        let mut arguments = Map::new();
        arguments.insert("input".to_string(), Value::String(input.into()));
        Self::new(name, arguments)
    }
}

/// Textual model output: either one string or a list of text parts.
#[derive(Debug, Clone, PartialEq)]
pub enum TextContent {
    Plain(String),
    Fragments(Vec<String>),
}

impl TextContent {
    /// Render to a single trimmed string. Fragments are joined with one space.
    pub fn render(&self) -> String {
        match self {
            TextContent::Plain(s) => s.trim().to_string(),
            TextContent::Fragments(parts) => parts.join(" ").trim().to_string(),
        }
    }
}

/// Normalised model response.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelResponse {
    /// The model asked for one or more tools to be run.
    ToolCalls(Vec<ToolCall>),
    /// A final textual answer.
    Text(TextContent),
    /// Anything the adapter could not classify.
    Raw(Value),
}

impl ModelResponse {
    pub fn plain(text: impl Into<String>) -> Self {
        ModelResponse::Text(TextContent::Plain(text.into()))
    }
}

/// Coerce an unclassified value to a trimmed string. JSON strings are
/// unquoted; everything else uses its compact JSON rendering.
pub fn render_raw(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string().trim().to_string(),
    }
}

// ── Request ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Tool declaration advertised to the model. Every tool takes one string.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
}

/// One round-trip to the model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatRequest {
    pub system: Option<String>,
    /// Prior turns, oldest first.
    pub history: Vec<ChatMessage>,
    pub user: String,
    pub tools: Vec<ToolSpec>,
}

impl ChatRequest {
    /// A bare single-message request with no system prompt and no tools.
    pub fn prompt(user: impl Into<String>) -> Self {
        Self { user: user.into(), ..Self::default() }
    }
}

// ── Provider enum ─────────────────────────────────────────────────────────────

/// All available provider backends.
///
/// Enum dispatch avoids `dyn` trait objects and the `async-trait` dependency.
/// Adding a backend = new module + new variant + new `complete` arm.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    Dummy(providers::dummy::DummyProvider),
    Scripted(providers::scripted::ScriptedProvider),
    OpenAiCompatible(providers::openai_compatible::OpenAiCompatibleProvider),
}

impl LlmProvider {
    /// Send one request and return the classified response.
    pub async fn complete(&self, request: &ChatRequest) -> Result<ModelResponse, ProviderError> {
        match self {
            LlmProvider::Dummy(p) => p.complete(request).await,
            LlmProvider::Scripted(p) => p.complete(request).await,
            LlmProvider::OpenAiCompatible(p) => p.complete(request).await,
        }
    }

    /// One-shot prompt without tools; any response shape is flattened to text.
    pub async fn complete_text(&self, prompt: &str) -> Result<String, ProviderError> {
        let resp = self.complete(&ChatRequest::prompt(prompt)).await?;
        Ok(match resp {
            ModelResponse::Text(t) => t.render(),
            ModelResponse::Raw(v) => render_raw(&v),
            ModelResponse::ToolCalls(calls) => {
                calls.into_iter().map(|c| c.name).collect::<Vec<_>>().join(" ")
            }
        })
    }

    /// Embed `input` with `model`. Only the OpenAI-compatible backend serves
    /// embeddings.
    pub async fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>, ProviderError> {
        match self {
            LlmProvider::OpenAiCompatible(p) => p.embed(model, input).await,
            other => Err(ProviderError::Request(format!(
                "provider '{}' does not support embeddings",
                other.model()
            ))),
        }
    }

    /// Model name for display and logging.
    pub fn model(&self) -> &str {
        match self {
            LlmProvider::Dummy(_) => "dummy",
            LlmProvider::Scripted(_) => "scripted",
            LlmProvider::OpenAiCompatible(p) => p.model(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_text_is_trimmed() {
        assert_eq!(TextContent::Plain("  hi there \n".into()).render(), "hi there");
    }

    #[test]
    fn fragments_join_with_single_space() {
        let t = TextContent::Fragments(vec!["  Hello".into(), "world ".into()]);
        assert_eq!(t.render(), "Hello world");
    }

    #[test]
    fn raw_string_is_unquoted() {
        assert_eq!(render_raw(&json!("  done ")), "done");
    }

    #[test]
    fn raw_object_uses_json_rendering() {
        assert_eq!(render_raw(&json!({"a": 1})), r#"{"a":1}"#);
        assert_eq!(render_raw(&Value::Null), "");
        assert_eq!(render_raw(&json!(42)), "42");
    }

    #[test]
    fn with_input_builds_single_argument() {
        let call = ToolCall::with_input("Weather", "Paris");
        assert_eq!(call.arguments.get("input"), Some(&json!("Paris")));
    }
}
