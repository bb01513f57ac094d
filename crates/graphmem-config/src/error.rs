//! Configuration errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No configuration file at {0}")]
    NotFound(String),

    #[error("Malformed configuration: {0}")]
    InvalidFormat(String),

    /// A value that parsed but is out of range or unknown.
    #[error("{field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Configuration references ${{{0}}} but it is not set")]
    EnvVarNotSet(String),

    #[error("Cannot read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot parse configuration TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl ConfigError {
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_value_names_the_field() {
        let err = ConfigError::invalid_value("memory.observation_cap", "must be positive");
        assert_eq!(err.to_string(), "memory.observation_cap: must be positive");
    }

    #[test]
    fn test_env_var_placeholder_is_echoed() {
        let err = ConfigError::EnvVarNotSet("NEPTUNE_TOKEN".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration references ${NEPTUNE_TOKEN} but it is not set"
        );
    }

    #[test]
    fn test_io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ConfigError = io_err.into();
        assert!(matches!(err, ConfigError::Io(_)));
        assert!(err.to_string().ends_with("denied"));
    }
}
