//! # graphmem Protocols
//!
//! Records, traits and error types shared by the graphmem engine, its
//! storage adapters and its tool surface. Contains no storage logic beyond
//! the observation log state machine, which every adapter must apply the
//! same way.
//!
//! ## Core Traits
//!
//! - [`GraphStore`] - Capability set every backend adapter implements
//! - [`EmbeddingProvider`] - Text to vector capability used by semantic search
//! - [`Tool`] - Engine operations exposed to agent clients

pub mod embedding;
pub mod error;
pub mod graph;
pub mod mode;
pub mod observation;
pub mod store;
pub mod tool;
pub mod types;

pub use embedding::{Embedding, EmbeddingProvider};
pub use error::{
    EmbeddingError, ErrorKind, ErrorReport, MaintenanceWarning, MemoryError, StoreError,
    ToolError, WarningStage, WriteOutcome,
};
pub use graph::*;
pub use mode::{Mode, Operation};
pub use observation::{Observation, ObservationError, ObservationLog, DEFAULT_OBSERVATION_CAP};
pub use store::{GraphStore, Page};
pub use tool::{Tool, ToolDefinition, ToolResult};
pub use types::*;
