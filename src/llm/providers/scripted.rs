//! Scripted provider: replays a queue of canned responses and records every
//! request it receives. Lets agent-level tests drive the full turn pipeline
//! without network access.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::llm::{ChatRequest, ModelResponse, ProviderError};

#[derive(Debug, Clone, Default)]
pub struct ScriptedProvider {
    replies: Arc<Mutex<VecDeque<Result<ModelResponse, String>>>>,
    seen: Arc<Mutex<Vec<ChatRequest>>>,
}

impl ScriptedProvider {
    pub fn new<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = Result<ModelResponse, String>>,
    {
        Self {
            replies: Arc::new(Mutex::new(replies.into_iter().collect())),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue one more reply.
    pub fn push(&self, reply: Result<ModelResponse, String>) {
        if let Ok(mut q) = self.replies.lock() {
            q.push_back(reply);
        }
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub async fn complete(&self, request: &ChatRequest) -> Result<ModelResponse, ProviderError> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(request.clone());
        }
        let next = self
            .replies
            .lock()
            .map_err(|_| ProviderError::Request("scripted provider lock poisoned".into()))?
            .pop_front();
        match next {
            Some(Ok(resp)) => Ok(resp),
            Some(Err(msg)) => Err(ProviderError::Request(msg)),
            None => Err(ProviderError::Request("scripted provider exhausted".into())),
        }
    }
}
