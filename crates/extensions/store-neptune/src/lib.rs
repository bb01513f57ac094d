//! Neptune-compatible graph store for graphmem.
//!
//! Entities are `:Memory` nodes keyed by `name`; relations are
//! `RELATED_TO` edges carrying their type in the `type` property. All
//! abstract operations are issued as openCypher over HTTP. Raw queries may
//! also use Gremlin, whose GraphSON results are unwrapped to plain JSON.

mod client;
mod cypher;
pub mod graphson;
mod rows;
mod store;

pub use client::{NeptuneClient, NeptuneStoreConfig};
pub use store::NeptuneGraphStore;
