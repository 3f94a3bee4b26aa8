//! Text embedders for the vector store.

use crate::error::AppError;
use crate::llm::LlmProvider;

pub const HASHED_DIM: usize = 384;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

pub enum Embedder {
    /// Offline feature-hashed bag of words. Deterministic across runs.
    Hashed { dim: usize },
    /// OpenAI-compatible `/embeddings` endpoint.
    Remote { provider: LlmProvider, model: String },
}

impl Embedder {
    pub fn hashed() -> Self {
        Embedder::Hashed { dim: HASHED_DIM }
    }

    pub fn describe(&self) -> String {
        match self {
            Embedder::Hashed { dim } => format!("hashed/{dim}"),
            Embedder::Remote { model, .. } => format!("remote/{model}"),
        }
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, AppError> {
        match self {
            Embedder::Hashed { dim } => Ok(hashed_embedding(text, *dim)),
            Embedder::Remote { provider, model } => provider
                .embed(model, text)
                .await
                .map_err(|e| AppError::Memory(format!("embedding failed: {e}"))),
        }
    }
}

/// Signed feature hashing over lowercase alphanumeric tokens, L2-normalized.
/// Text without any token maps to the zero vector.
pub fn hashed_embedding(text: &str, dim: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; dim];
    if dim == 0 {
        return v;
    }
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let h = fnv1a(token.to_lowercase().as_bytes());
        let idx = (h % dim as u64) as usize;
        let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
        v[idx] += sign;
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    v
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |h, b| (h ^ u64::from(*b)).wrapping_mul(FNV_PRIME))
}

/// Cosine similarity; zero when either vector is zero or lengths differ.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na * nb)
}
