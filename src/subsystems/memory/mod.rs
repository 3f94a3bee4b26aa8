//! Memory subsystem: short-term conversation buffer plus long-term vector
//! recall of past interactions.

pub mod buffer;
pub mod embed;
pub mod vector;

use tracing::{info, warn};

use crate::config::MemoryConfig;
use crate::error::AppError;
use crate::llm::ChatMessage;
use buffer::ConversationBuffer;
use embed::Embedder;
use vector::VectorStore;

pub struct MemoryManager {
    buffer: ConversationBuffer,
    store: VectorStore,
    embedder: Embedder,
    retrieve_k: usize,
}

impl MemoryManager {
    pub fn open(config: &MemoryConfig, embedder: Embedder) -> Result<Self, AppError> {
        let store = VectorStore::open(&config.vector_dir, &config.collection)?;
        info!(
            path = %store.path().display(),
            records = store.len(),
            embedder = %embedder.describe(),
            "memory ready"
        );
        Ok(Self {
            buffer: ConversationBuffer::new(config.short_term_turns),
            store,
            embedder,
            retrieve_k: config.retrieve_k,
        })
    }

    /// Past interactions relevant to `query`, newline-joined. Empty on any failure.
    pub async fn retrieve_context(&self, query: &str) -> String {
        match self.embedder.embed(query).await {
            Ok(q) => self.store.search(&q, self.retrieve_k).join("\n"),
            Err(e) => {
                warn!(error = %e, "memory retrieval failed; continuing without context");
                String::new()
            }
        }
    }

    /// Record a finished turn in the short-term buffer and the vector store.
    /// A failed store write is logged and otherwise ignored.
    pub async fn save_interaction(&mut self, user: &str, assistant: &str) {
        self.buffer.push(user, assistant);
        let text = format!("User asked: {user}\nFriday responded: {assistant}");
        let result = match self.embedder.embed(&text).await {
            Ok(embedding) => self.store.add_text(&text, embedding).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(id) => info!(%id, "saved interaction to vector store"),
            Err(e) => warn!(error = %e, "interaction not persisted"),
        }
    }

    pub fn history(&self) -> Vec<ChatMessage> {
        self.buffer.as_messages()
    }

    pub fn buffer(&self) -> &ConversationBuffer {
        &self.buffer
    }

    pub fn stored(&self) -> usize {
        self.store.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbedderKind;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> MemoryConfig {
        MemoryConfig {
            collection: "friday_memory".into(),
            vector_dir: dir.path().join("vector_db"),
            retrieve_k: 3,
            short_term_turns: 20,
            embedder: EmbedderKind::Hashed,
            embedding_model: String::new(),
        }
    }

    #[tokio::test]
    async fn saved_turns_are_retrievable_with_prefix_format() {
        let dir = TempDir::new().unwrap();
        let mut m = MemoryManager::open(&config(&dir), Embedder::hashed()).unwrap();
        assert_eq!(m.retrieve_context("anything").await, "");

        m.save_interaction("weather in paris", "It is sunny.").await;
        let ctx = m.retrieve_context("weather in paris").await;
        assert_eq!(ctx, "User asked: weather in paris\nFriday responded: It is sunny.");
        assert_eq!(m.history().len(), 2);
    }

    #[tokio::test]
    async fn retrieval_caps_at_k() {
        let dir = TempDir::new().unwrap();
        let mut m = MemoryManager::open(&config(&dir), Embedder::hashed()).unwrap();
        for i in 0..5 {
            m.save_interaction(&format!("question {i}"), "answer").await;
        }
        assert_eq!(m.stored(), 5);
        let ctx = m.retrieve_context("question").await;
        assert_eq!(ctx.matches("User asked:").count(), 3);
    }

    #[tokio::test]
    async fn embedder_failure_keeps_buffer_but_skips_store() {
        let dir = TempDir::new().unwrap();
        let remote = Embedder::Remote {
            provider: crate::llm::LlmProvider::Dummy(crate::llm::providers::dummy::DummyProvider),
            model: "m".into(),
        };
        let mut m = MemoryManager::open(&config(&dir), remote).unwrap();
        m.save_interaction("hi", "hello").await;
        assert_eq!(m.stored(), 0);
        assert_eq!(m.buffer().len(), 1);
        assert_eq!(m.retrieve_context("hi").await, "");
    }
}
