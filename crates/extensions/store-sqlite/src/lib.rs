//! Embedded SQLite graph store for graphmem.
//!
//! Entities and relations live in two tables with foreign keys that cascade
//! relation deletion. Entity names, types and metadata are indexed by an
//! FTS5 table kept in sync by triggers. Raw queries use SQL, the store's
//! single dialect.

mod schema;
mod store;

pub use store::SqliteGraphStore;
