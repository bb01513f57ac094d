//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;

const MODES: &[&str] = &["read", "write", "full"];
const BACKENDS: &[&str] = &["sqlite", "neptune"];
const EMBEDDING_PROVIDERS: &[&str] = &["none", "openai", "hash"];

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Convert the first error, if any, into a [`ConfigError`].
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(err) => Err(ConfigError::invalid_value(err.path, err.message)),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_memory(config, &mut result);
        Self::validate_backend(config, &mut result);
        Self::validate_embedding(config, &mut result);
        Self::validate_search(config, &mut result);

        Ok(result)
    }

    fn validate_memory(config: &Config, result: &mut ValidationResult) {
        let memory = &config.memory;

        if !MODES.contains(&memory.mode.to_lowercase().as_str()) {
            result.add_error(ValidationError::new(
                "memory.mode",
                format!("Unknown mode '{}', valid values: {:?}", memory.mode, MODES),
            ));
        }

        if memory.observation_cap == 0 {
            result.add_error(ValidationError::new(
                "memory.observation_cap",
                "observation_cap must be greater than 0",
            ));
        }

        if memory.subgraph_threshold == 0 {
            result.add_error(ValidationError::new(
                "memory.subgraph_threshold",
                "subgraph_threshold must be greater than 0",
            ));
        }

        if memory.subgraph_max_entities == 0 {
            result.add_error(ValidationError::new(
                "memory.subgraph_max_entities",
                "subgraph_max_entities must be greater than 0",
            ));
        }

        if memory.operation_timeout_secs == 0 {
            result.add_error(ValidationError::new(
                "memory.operation_timeout_secs",
                "operation_timeout_secs must be greater than 0",
            ));
        }

        if memory.relation_page_size == 0 {
            result.add_error(ValidationError::new(
                "memory.relation_page_size",
                "relation_page_size must be greater than 0",
            ));
        }

        if memory.observation_cap > 100 {
            result.add_warning(ValidationWarning::new(
                "memory.observation_cap",
                "observation_cap is very high (>100), entity reads will grow accordingly",
            ));
        }
    }

    fn validate_backend(config: &Config, result: &mut ValidationResult) {
        let backend = &config.backend;

        if !BACKENDS.contains(&backend.kind.as_str()) {
            result.add_error(ValidationError::new(
                "backend.kind",
                format!("Unknown backend '{}', valid values: {:?}", backend.kind, BACKENDS),
            ));
            return;
        }

        if backend.kind == "sqlite" && backend.sqlite.path.is_none() {
            result.add_warning(ValidationWarning::new(
                "backend.sqlite.path",
                "SQLite path not set, memory will not survive a restart",
            ));
        }

        if backend.kind == "neptune" {
            match &backend.neptune {
                None => result.add_error(ValidationError::new(
                    "backend.neptune",
                    "[backend.neptune] section is required for the neptune backend",
                )),
                Some(neptune) => {
                    if neptune.endpoint.trim().is_empty() {
                        result.add_error(ValidationError::new(
                            "backend.neptune.endpoint",
                            "endpoint cannot be empty",
                        ));
                    } else if neptune.endpoint.contains("://") {
                        result.add_error(ValidationError::new(
                            "backend.neptune.endpoint",
                            "endpoint must be host:port without a scheme; use use_https instead",
                        ));
                    }

                    if neptune.request_timeout_secs == 0 {
                        result.add_error(ValidationError::new(
                            "backend.neptune.request_timeout_secs",
                            "request_timeout_secs must be greater than 0",
                        ));
                    }

                    if !neptune.use_https {
                        result.add_warning(ValidationWarning::new(
                            "backend.neptune.use_https",
                            "HTTPS is disabled, traffic to the graph endpoint is unencrypted",
                        ));
                    }
                }
            }
        }
    }

    fn validate_embedding(config: &Config, result: &mut ValidationResult) {
        let embedding = &config.embedding;

        if !EMBEDDING_PROVIDERS.contains(&embedding.provider.as_str()) {
            result.add_error(ValidationError::new(
                "embedding.provider",
                format!(
                    "Unknown embedding provider '{}', valid values: {:?}",
                    embedding.provider, EMBEDDING_PROVIDERS
                ),
            ));
            return;
        }

        if embedding.is_enabled() && embedding.dimension == 0 {
            result.add_error(ValidationError::new(
                "embedding.dimension",
                "dimension must be greater than 0",
            ));
        }

        if embedding.provider == "openai" && embedding.api_key.is_none() {
            result.add_error(ValidationError::new(
                "embedding.api_key",
                "api_key is required for the openai provider",
            ));
        }

        if let Some(ref url) = embedding.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                result.add_error(ValidationError::new(
                    "embedding.base_url",
                    "base_url must start with http:// or https://",
                ));
            }
        }

        if embedding.provider == "hash" {
            result.add_warning(ValidationWarning::new(
                "embedding.provider",
                "hash embeddings are not semantic; use them for testing only",
            ));
        }
    }

    fn validate_search(config: &Config, result: &mut ValidationResult) {
        let search = &config.search;

        for (path, weight) in [
            ("search.semantic_weight", search.semantic_weight),
            ("search.keyword_weight", search.keyword_weight),
        ] {
            if !(0.0..=1.0).contains(&weight) {
                result.add_error(ValidationError::new(path, "weight must be within [0, 1]"));
            }
        }

        if search.semantic_weight + search.keyword_weight == 0.0 {
            result.add_error(ValidationError::new(
                "search",
                "semantic_weight and keyword_weight cannot both be 0",
            ));
        }

        if search.default_top_k == 0 {
            result.add_error(ValidationError::new(
                "search.default_top_k",
                "default_top_k must be greater than 0",
            ));
        }

        if search.candidate_multiplier == 0 {
            result.add_error(ValidationError::new(
                "search.candidate_multiplier",
                "candidate_multiplier must be greater than 0",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
