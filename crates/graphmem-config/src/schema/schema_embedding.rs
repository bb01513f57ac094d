//! Embedding provider and search configuration.

use serde::{Deserialize, Serialize};

/// Embedding provider selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "none", "openai" (any OpenAI-compatible endpoint) or "hash".
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Number of query embeddings kept in memory. 0 disables caching.
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "none"
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_key: None,
            model: None,
            base_url: None,
            dimension: default_dimension(),
            cache_size: default_cache_size(),
        }
    }
}

fn default_provider() -> String {
    "none".to_string()
}

fn default_dimension() -> usize {
    384
}

fn default_cache_size() -> usize {
    256
}

/// Search ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Weight of the semantic score in hybrid search.
    #[serde(default = "default_weight")]
    pub semantic_weight: f32,

    /// Weight of the full-text score in hybrid search.
    #[serde(default = "default_weight")]
    pub keyword_weight: f32,

    /// Full-text candidates fetched per hybrid query, as a multiple of top_k.
    #[serde(default = "default_candidate_multiplier")]
    pub candidate_multiplier: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            semantic_weight: default_weight(),
            keyword_weight: default_weight(),
            candidate_multiplier: default_candidate_multiplier(),
        }
    }
}

fn default_top_k() -> usize {
    10
}

fn default_weight() -> f32 {
    0.5
}

fn default_candidate_multiplier() -> usize {
    4
}
