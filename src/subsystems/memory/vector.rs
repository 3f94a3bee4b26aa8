//! File-backed vector collection.
//!
//! One JSON document per collection at `{dir}/{collection}.json`, rewritten
//! after every insert through a temp file + rename so a crash never leaves a
//! half-written store behind. Search is a linear cosine scan.

use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::embed::cosine;
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: Uuid,
    pub text: String,
    pub embedding: Vec<f32>,
    pub created_at: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CollectionFile {
    collection: String,
    #[serde(default)]
    records: Vec<MemoryRecord>,
}

#[derive(Debug)]
pub struct VectorStore {
    path: PathBuf,
    data: CollectionFile,
}

impl VectorStore {
    /// Open (or create on first write) the collection under `dir`.
    pub fn open(dir: &Path, collection: &str) -> Result<Self, AppError> {
        std::fs::create_dir_all(dir)
            .map_err(|e| AppError::Memory(format!("cannot create {}: {e}", dir.display())))?;
        let path = dir.join(format!("{collection}.json"));
        let data = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw)
                .map_err(|e| AppError::Memory(format!("corrupt store {}: {e}", path.display())))?
        } else {
            CollectionFile { collection: collection.to_string(), records: Vec::new() }
        };
        debug!(path = %path.display(), records = data.records.len(), "vector store opened");
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.data.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.records.is_empty()
    }

    /// Append a record and persist the whole collection.
    pub async fn add_text(&mut self, text: &str, embedding: Vec<f32>) -> Result<Uuid, AppError> {
        let id = Uuid::now_v7();
        self.data.records.push(MemoryRecord {
            id,
            text: text.to_string(),
            embedding,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        });
        if let Err(e) = self.persist().await {
            self.data.records.pop();
            return Err(e);
        }
        Ok(id)
    }

    /// Up to `k` record texts, most similar first. Ties keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<String> {
        let mut scored: Vec<(f32, &MemoryRecord)> = self
            .data
            .records
            .iter()
            .map(|r| (cosine(query, &r.embedding), r))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.into_iter().take(k).map(|(_, r)| r.text.clone()).collect()
    }

    async fn persist(&self) -> Result<(), AppError> {
        let json = serde_json::to_vec(&self.data)
            .map_err(|e| AppError::Memory(format!("serialize store: {e}")))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
