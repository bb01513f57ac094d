//! Embedding provider protocol.
//!
//! An embedding provider maps text to a fixed-length vector. The engine
//! treats it as an opaque, injected capability.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use crate::error::EmbeddingError;

/// A dense vector representation of some text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    /// Vector representation.
    pub vector: Vec<f32>,
    /// Dimension of the embedding.
    pub dimension: usize,
}

impl Embedding {
    pub fn new(vector: Vec<f32>) -> Self {
        let dimension = vector.len();
        Self { vector, dimension }
    }

    /// Cosine similarity with a raw vector. Mismatched dimensions or zero
    /// vectors score 0.
    pub fn cosine_similarity_to(&self, other: &[f32]) -> f32 {
        if self.dimension != other.len() {
            return 0.0;
        }

        let dot: f32 = self.vector.iter().zip(other.iter()).map(|(a, b)| a * b).sum();
        let norm_a: f32 = self.vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = other.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot / (norm_a * norm_b)
    }

    pub fn cosine_similarity(&self, other: &Self) -> f32 {
        self.cosine_similarity_to(&other.vector)
    }
}

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider identifier used in logs.
    fn id(&self) -> &str;

    /// Generate an embedding for text.
    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError>;

    /// Generate embeddings for multiple texts.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    /// Embedding dimension.
    fn dimension(&self) -> usize;
}
