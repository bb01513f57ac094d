//! Engine tuning derived from the loaded configuration.

use std::time::Duration;

use graphmem_config::Config;
use graphmem_protocols::{DEFAULT_OBSERVATION_CAP, MemoryError, Mode};

/// Weights and limits of the search module.
#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub default_top_k: usize,
    pub semantic_weight: f32,
    pub keyword_weight: f32,
    /// Each ranking contributes `top_k * candidate_multiplier` candidates
    /// to a hybrid search.
    pub candidate_multiplier: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_top_k: 10,
            semantic_weight: 0.5,
            keyword_weight: 0.5,
            candidate_multiplier: 4,
        }
    }
}

/// Runtime settings of a [`MemoryEngine`](crate::MemoryEngine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub mode: Mode,
    pub observation_cap: usize,
    /// Direct outgoing relations an entity may hold before decomposition.
    pub subgraph_threshold: usize,
    /// Distinct targets per sub-graph.
    pub subgraph_max_entities: usize,
    pub operation_timeout: Duration,
    pub relation_page_size: usize,
    pub search: SearchSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Write,
            observation_cap: DEFAULT_OBSERVATION_CAP,
            subgraph_threshold: 8,
            subgraph_max_entities: 50,
            operation_timeout: Duration::from_secs(30),
            relation_page_size: 100,
            search: SearchSettings::default(),
        }
    }
}

impl EngineConfig {
    /// Build from a validated [`Config`].
    pub fn from_config(config: &Config) -> Result<Self, MemoryError> {
        let memory = &config.memory;
        let mode = memory
            .mode
            .parse::<Mode>()
            .map_err(MemoryError::configuration)?;

        Ok(Self {
            mode,
            observation_cap: memory.observation_cap.max(1),
            subgraph_threshold: memory.subgraph_threshold,
            subgraph_max_entities: memory.subgraph_max_entities.max(1),
            operation_timeout: Duration::from_secs(memory.operation_timeout_secs.max(1)),
            relation_page_size: memory.relation_page_size.max(1),
            search: SearchSettings {
                default_top_k: config.search.default_top_k.max(1),
                semantic_weight: config.search.semantic_weight,
                keyword_weight: config.search.keyword_weight,
                candidate_multiplier: config.search.candidate_multiplier.max(1),
            },
        })
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    pub fn with_subgraph_limits(mut self, threshold: usize, max_entities: usize) -> Self {
        self.subgraph_threshold = threshold;
        self.subgraph_max_entities = max_entities.max(1);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.relation_page_size = page_size.max(1);
        self
    }
}
