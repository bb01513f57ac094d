//! Embedding providers for graphmem semantic search.
//!
//! - [`OpenAIEmbedding`] calls an OpenAI-compatible `/embeddings` endpoint.
//! - [`HashEmbedding`] is a deterministic, offline feature-hashing provider.
//! - [`CachedEmbeddingProvider`] wraps either and reuses recent results.

mod cache;
mod hash;
mod openai;

pub use cache::CachedEmbeddingProvider;
pub use hash::HashEmbedding;
pub use openai::{OpenAIEmbedding, OpenAIEmbeddingConfig};
