//! # graphmem Config
//!
//! TOML configuration for the graphmem memory server: backend selection and
//! connection parameters, operational mode, graph maintenance limits,
//! embedding provider, search weights and logging.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
