//! Feature-hashing embedding provider.

use async_trait::async_trait;

use graphmem_protocols::{Embedding, EmbeddingError, EmbeddingProvider};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Deterministic bag-of-words embedding.
///
/// Each lowercase alphanumeric token is hashed into a signed bucket, so
/// texts sharing words point in similar directions. Not semantic. Output is
/// stable across processes since entity vectors are persisted.
pub struct HashEmbedding {
    dimension: usize,
}

impl HashEmbedding {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn hash_text(&self, text: &str) -> Embedding {
        let mut vector = vec![0.0f32; self.dimension];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = fnv1a(&token.to_lowercase());
            let idx = (hash % self.dimension as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[idx] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }

        Embedding::new(vector)
    }
}

impl Default for HashEmbedding {
    fn default() -> Self {
        Self::new(384)
    }
}

fn fnv1a(text: &str) -> u64 {
    text.bytes().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(FNV_PRIME)
    })
}

#[async_trait]
impl EmbeddingProvider for HashEmbedding {
    fn id(&self) -> &str {
        "hash"
    }

    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        Ok(self.hash_text(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.hash_text(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dimension_and_norm() {
        let provider = HashEmbedding::new(64);
        let emb = provider.embed("hello world").await.unwrap();
        assert_eq!(emb.dimension, 64);
        let norm: f32 = emb.vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_identical_texts_match() {
        let provider = HashEmbedding::new(128);
        let a = provider.embed("Acme Corp Organization").await.unwrap();
        let b = provider.embed("acme corp, organization").await.unwrap();
        assert!((a.cosine_similarity(&b) - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_shared_words_score_higher() {
        let provider = HashEmbedding::new(256);
        let query = provider.embed("senior engineer seattle").await.unwrap();
        let close = provider.embed("Ada Person senior engineer").await.unwrap();
        let far = provider.embed("quarterly revenue report").await.unwrap();
        assert!(query.cosine_similarity(&close) > query.cosine_similarity(&far));
    }

    #[tokio::test]
    async fn test_empty_text_is_zero_vector() {
        let provider = HashEmbedding::new(16);
        let emb = provider.embed("  ").await.unwrap();
        assert!(emb.vector.iter().all(|v| *v == 0.0));
    }

    #[tokio::test]
    async fn test_batch() {
        let provider = HashEmbedding::default();
        let out = provider.embed_batch(&["a", "b", "c"]).await.unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(provider.dimension(), 384);
    }

    #[test]
    fn test_zero_dimension_is_clamped() {
        assert_eq!(HashEmbedding::new(0).dimension(), 1);
    }

    #[test]
    fn test_fnv_is_stable() {
        assert_eq!(fnv1a(""), FNV_OFFSET);
        assert_eq!(fnv1a("a"), 0xaf63_dc4c_8601_ec8c);
    }
}
