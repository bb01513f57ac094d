//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

mod schema_backend;
mod schema_embedding;

pub use schema_backend::*;
pub use schema_embedding::*;

/// Shared default helper used by submodules.
pub(crate) fn default_true() -> bool {
    true
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Engine behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Operation gate: "read", "write" or "full".
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Maximum observations kept per entity.
    #[serde(default = "default_observation_cap")]
    pub observation_cap: usize,

    /// Outgoing-relation count above which a hub is decomposed.
    #[serde(default = "default_subgraph_threshold")]
    pub subgraph_threshold: usize,

    /// Distinct targets a single sub-graph holds before another is opened.
    #[serde(default = "default_subgraph_max_entities")]
    pub subgraph_max_entities: usize,

    /// Bound on every backend call, in seconds.
    #[serde(default = "default_operation_timeout_secs")]
    pub operation_timeout_secs: u64,

    /// Page size used when streaming relations.
    #[serde(default = "default_relation_page_size")]
    pub relation_page_size: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            observation_cap: default_observation_cap(),
            subgraph_threshold: default_subgraph_threshold(),
            subgraph_max_entities: default_subgraph_max_entities(),
            operation_timeout_secs: default_operation_timeout_secs(),
            relation_page_size: default_relation_page_size(),
        }
    }
}

fn default_mode() -> String {
    "write".to_string()
}

fn default_observation_cap() -> usize {
    15
}

fn default_subgraph_threshold() -> usize {
    8
}

fn default_subgraph_max_entities() -> usize {
    50
}

fn default_operation_timeout_secs() -> u64 {
    30
}

fn default_relation_page_size() -> usize {
    100
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily rolling log files. Console only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,

    /// Emit JSON lines instead of human-readable text.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
