//! # graphmem Core
//!
//! The knowledge-graph memory engine. [`MemoryEngine`] gates each operation
//! by [`Mode`](graphmem_protocols::Mode), validates input, bounds every
//! store call by a timeout and keeps the graph's lifecycle invariants:
//!
//! - observation logs stay within their cap (applied atomically by the store)
//! - relation endpoints always exist
//! - no entity keeps more direct outgoing relations than the sub-graph
//!   threshold
//!
//! Search over the graph mixes the store's native text search with
//! embedding similarity.

mod browse;
mod config;
mod engine;
mod fusion;
mod neighborhood;
mod relations;
mod schema;
mod search;
mod stream;
mod subgraph;
mod validation;

#[cfg(test)]
mod test_support;

pub use config::{EngineConfig, SearchSettings};
pub use engine::MemoryEngine;
pub use neighborhood::MAX_NEIGHBORHOOD_DEPTH;
pub use stream::RelationStream;
