//! Dummy LLM provider: echoes the user message back prefixed with `[echo]`.
//! Used when no API key is configured, so the console loop still runs.

use crate::llm::{ChatRequest, ModelResponse, ProviderError};

#[derive(Debug, Clone)]
pub struct DummyProvider;

impl DummyProvider {
    pub async fn complete(&self, request: &ChatRequest) -> Result<ModelResponse, ProviderError> {
        Ok(ModelResponse::plain(format!("[echo] {}", request.user)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn complete_prefixes_echo() {
        let p = DummyProvider;
        let resp = p.complete(&ChatRequest::prompt("hello")).await.unwrap();
        assert_eq!(resp, ModelResponse::plain("[echo] hello"));
    }

    #[tokio::test]
    async fn complete_empty_input() {
        let p = DummyProvider;
        let resp = p.complete(&ChatRequest::prompt("")).await.unwrap();
        assert_eq!(resp, ModelResponse::plain("[echo] "));
    }
}
