//! OpenAI-compatible chat completion provider (`/chat/completions`).
//!
//! Covers OpenAI itself, the Gemini OpenAI-compatible endpoint, and local
//! servers (Ollama, LM Studio…). All wire types are private to this module.
//! [`adapt_message`] is the one place that inspects the response shape and
//! turns it into a [`ModelResponse`].

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, error, trace};

use crate::llm::{ChatRequest, ModelResponse, ProviderError, TextContent, ToolCall, ToolSpec};

/// Adapter for any HTTP endpoint implementing `/chat/completions`.
///
/// Constructed once per model tier at startup, then cheaply cloned because
/// `reqwest::Client` is an `Arc` internally.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    client: Client,
    api_base_url: String,
    model: String,
    temperature: f32,
    api_key: Option<String>,
}

impl OpenAiCompatibleProvider {
    /// `api_key` is `None` for keyless local models. When present it is sent
    /// as `Authorization: Bearer <key>` on every request.
    pub fn new(
        api_base_url: String,
        model: String,
        temperature: f32,
        timeout_seconds: u64,
        api_key: Option<String>,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, api_base_url, model, temperature, api_key })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One round-trip: system + history + user message, tools advertised.
    pub async fn complete(&self, request: &ChatRequest) -> Result<ModelResponse, ProviderError> {
        let payload = build_payload(&self.model, self.temperature, request);

        debug!(
            model = %payload.model,
            history = request.history.len(),
            tools = request.tools.len(),
            content_len = request.user.len(),
            "sending LLM request"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(&payload)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(payload = %json, "full LLM request payload");
        }

        let url = format!("{}/chat/completions", self.api_base_url);
        let mut req = self.client.post(&url).json(&payload);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(|e| {
            error!(%url, error = %e, "LLM HTTP request failed (transport)");
            ProviderError::Request(e.to_string())
        })?;
        let response = check_status(response).await?;

        let parsed = response.json::<ChatCompletionResponse>().await.map_err(|e| {
            error!(error = %e, "failed to deserialize LLM response");
            ProviderError::Request(format!("failed to parse response body: {e}"))
        })?;

        if let Some(u) = &parsed.usage {
            debug!(
                input_tokens = u.prompt_tokens,
                output_tokens = u.completion_tokens,
                "llm usage"
            );
        }

        let message = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| ProviderError::Request("response contained no choices".into()))?;

        Ok(adapt_message(message))
    }

    /// Embed `input` with `model` via `/embeddings`.
    pub async fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>, ProviderError> {
        let url = format!("{}/embeddings", self.api_base_url);
        let mut req = self.client.post(&url).json(&EmbeddingRequest { model, input });
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let response = req
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;
        let response = check_status(response).await?;
        let parsed = response
            .json::<EmbeddingResponse>()
            .await
            .map_err(|e| ProviderError::Request(format!("failed to parse embedding body: {e}")))?;
        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| ProviderError::Request("embedding response contained no data".into()))
    }
}

// ── Request building ──────────────────────────────────────────────────────────

fn build_payload(model: &str, temperature: f32, request: &ChatRequest) -> ChatCompletionRequest {
    let mut messages = Vec::with_capacity(request.history.len() + 2);
    if let Some(sys) = &request.system {
        messages.push(WireMessage { role: "system", content: sys.clone() });
    }
    for m in &request.history {
        messages.push(WireMessage { role: m.role.as_str(), content: m.content.clone() });
    }
    messages.push(WireMessage { role: "user", content: request.user.clone() });

    ChatCompletionRequest {
        model: model.to_string(),
        messages,
        temperature,
        tools: request.tools.iter().map(tool_declaration).collect(),
    }
}

fn tool_declaration(spec: &ToolSpec) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": spec.name,
            "description": spec.description,
            "parameters": {
                "type": "object",
                "properties": {
                    "input": { "type": "string", "description": "Input for the tool." }
                },
                "required": []
            }
        }
    })
}

// ── Response adapter ──────────────────────────────────────────────────────────

/// Classify an assistant message.
///
/// - non-empty `tool_calls` → [`ModelResponse::ToolCalls`]
/// - string content → [`TextContent::Plain`]
/// - array of text parts (`{"type":"text","text":..}` or bare strings) → [`TextContent::Fragments`]
/// - anything else → [`ModelResponse::Raw`]
fn adapt_message(message: ChoiceMessage) -> ModelResponse {
    let calls: Vec<ToolCall> = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|c| ToolCall::new(c.function.name, parse_arguments(c.function.arguments)))
        .collect();
    if !calls.is_empty() {
        return ModelResponse::ToolCalls(calls);
    }

    match message.content {
        Some(Value::String(s)) => ModelResponse::Text(TextContent::Plain(s)),
        Some(Value::Array(parts)) => match text_fragments(&parts) {
            Some(fragments) => ModelResponse::Text(TextContent::Fragments(fragments)),
            None => ModelResponse::Raw(Value::Array(parts)),
        },
        Some(other) => ModelResponse::Raw(other),
        None => ModelResponse::Raw(Value::Null),
    }
}

/// Returns `None` unless every part is textual.
fn text_fragments(parts: &[Value]) -> Option<Vec<String>> {
    parts
        .iter()
        .map(|p| match p {
            Value::String(s) => Some(s.clone()),
            Value::Object(o) => o.get("text").and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
        .collect()
}

/// Arguments arrive as a JSON-encoded string (OpenAI) or an object (some
/// compatible servers). Unparseable strings are kept as `{"input": raw}`.
fn parse_arguments(arguments: Value) -> Map<String, Value> {
    let value = match arguments {
        Value::String(s) if s.trim().is_empty() => return Map::new(),
        Value::String(s) => match serde_json::from_str::<Value>(&s) {
            Ok(v) => v,
            Err(_) => Value::String(s),
        },
        other => other,
    };
    match value {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("input".to_string(), other);
            map
        }
    }
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<UsageData>,
}

#[derive(Debug, Deserialize)]
struct UsageData {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<Value>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

// Error envelope used by OpenAI and compatible APIs. Gemini wraps it in a
// one-element array.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    code: Option<Value>,
}

/// Return the response if successful, or a structured error.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());
    let message = error_message(status.as_u16(), &body);

    error!(%status, %message, "LLM request returned HTTP error");
    Err(ProviderError::Request(message))
}

fn error_message(status: u16, body: &str) -> String {
    let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok().or_else(|| {
        serde_json::from_str::<Vec<ErrorEnvelope>>(body)
            .ok()
            .and_then(|v| v.into_iter().next())
    });
    match envelope {
        Some(env) => {
            let code = env
                .error
                .code
                .map(|v| match v {
                    Value::String(s) => format!(" [code={s}]"),
                    other => format!(" [code={other}]"),
                })
                .unwrap_or_default();
            format!("HTTP {status}{code}: {}", env.error.message)
        }
        None => format!("HTTP {status}: {body}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatMessage, Role};

    fn message(v: Value) -> ChoiceMessage {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn plain_string_content() {
        let resp = adapt_message(message(json!({"role": "assistant", "content": "  Hi! "})));
        assert_eq!(resp, ModelResponse::Text(TextContent::Plain("  Hi! ".into())));
    }

    #[test]
    fn text_parts_become_fragments() {
        let resp = adapt_message(message(json!({
            "content": [{"type": "text", "text": "Hello"}, "world"]
        })));
        assert_eq!(
            resp,
            ModelResponse::Text(TextContent::Fragments(vec!["Hello".into(), "world".into()]))
        );
    }

    #[test]
    fn non_text_parts_stay_raw() {
        let resp = adapt_message(message(json!({"content": [{"type": "image_url"}]})));
        assert!(matches!(resp, ModelResponse::Raw(Value::Array(_))));
    }

    #[test]
    fn null_content_is_raw_null() {
        let resp = adapt_message(message(json!({"content": null})));
        assert_eq!(resp, ModelResponse::Raw(Value::Null));
    }

    #[test]
    fn tool_calls_win_over_content() {
        let resp = adapt_message(message(json!({
            "content": "ignored",
            "tool_calls": [{
                "id": "call_1",
                "type": "function",
                "function": {"name": "Weather", "arguments": "{\"location\": \"Paris\", \"unit\": \"c\"}"}
            }]
        })));
        let ModelResponse::ToolCalls(calls) = resp else { panic!("expected tool calls") };
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "Weather");
        let keys: Vec<&String> = calls[0].arguments.keys().collect();
        assert_eq!(keys, ["location", "unit"]);
    }

    #[test]
    fn empty_tool_calls_fall_back_to_content() {
        let resp = adapt_message(message(json!({"content": "text", "tool_calls": []})));
        assert_eq!(resp, ModelResponse::Text(TextContent::Plain("text".into())));
    }

    #[test]
    fn arguments_object_and_garbage() {
        assert_eq!(parse_arguments(json!({"input": "x"})).get("input"), Some(&json!("x")));
        assert_eq!(parse_arguments(json!("not json")).get("input"), Some(&json!("not json")));
        assert!(parse_arguments(json!("")).is_empty());
        assert!(parse_arguments(Value::Null).is_empty());
    }

    #[test]
    fn payload_orders_system_history_user_and_declares_tools() {
        let request = ChatRequest {
            system: Some("persona".into()),
            history: vec![
                ChatMessage { role: Role::User, content: "hi".into() },
                ChatMessage { role: Role::Assistant, content: "hello".into() },
            ],
            user: "now".into(),
            tools: vec![ToolSpec { name: "Weather", description: "weather" }],
        };
        let payload = build_payload("m", 0.5, &request);
        let roles: Vec<&str> = payload.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, ["system", "user", "assistant", "user"]);
        assert_eq!(payload.tools[0]["function"]["name"], "Weather");

        let without_tools = build_payload("m", 0.5, &ChatRequest::prompt("x"));
        let body = serde_json::to_value(&without_tools).unwrap();
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn error_envelope_variants() {
        let body = r#"{"error": {"message": "bad key", "code": "invalid_api_key"}}"#;
        assert_eq!(error_message(401, body), "HTTP 401 [code=invalid_api_key]: bad key");
        let gemini = r#"[{"error": {"message": "quota", "code": 429}}]"#;
        assert_eq!(error_message(429, gemini), "HTTP 429 [code=429]: quota");
        assert_eq!(error_message(500, "oops"), "HTTP 500: oops");
    }
}
