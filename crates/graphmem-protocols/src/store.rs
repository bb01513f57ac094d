//! Entity/relation store protocol.
//!
//! Every backend adapter implements [`GraphStore`]. Adapters translate the
//! abstract operations into their native query language and normalise rows
//! into [`Entity`] and [`Relation`] records before returning them. The engine
//! never looks at backend identity beyond logging and error context.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::graph::{
    Direction, Entity, EntityUpsert, GraphSchema, QueryDialect, QueryResult, Relation,
    RelationFilter, RelationKey, ScoredEntity, StoreStatus, TextMatch,
};
use crate::types::Metadata;

/// Offset/limit window over an ordered result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Page {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    pub fn first(limit: usize) -> Self {
        Self { offset: 0, limit }
    }

    pub fn next(&self) -> Self {
        Self {
            offset: self.offset + self.limit,
            limit: self.limit,
        }
    }
}

/// Capability set of a graph storage backend.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Backend identifier used in logs and error context.
    fn id(&self) -> &str;

    /// Dialects accepted by [`run_query`](Self::run_query).
    fn dialects(&self) -> &[QueryDialect];

    /// Create or merge an entity in one atomic operation: set the type (if
    /// given), merge metadata and append observations through
    /// [`ObservationLog`](crate::ObservationLog) semantics. Returns the
    /// committed snapshot.
    async fn upsert_entity(&self, upsert: EntityUpsert) -> Result<Entity, StoreError>;

    /// Create a relation or merge properties into the existing triple. Both
    /// endpoints must exist.
    async fn upsert_relation(&self, relation: Relation) -> Result<Relation, StoreError>;

    /// Delete an entity and every relation touching it. Returns `false` if
    /// the entity did not exist.
    async fn delete_entity(&self, name: &str) -> Result<bool, StoreError>;

    /// Delete one relation triple. Returns `false` if it did not exist.
    async fn delete_relation(&self, key: &RelationKey) -> Result<bool, StoreError>;

    async fn fetch_entity(&self, name: &str) -> Result<Option<Entity>, StoreError>;

    async fn fetch_relation(&self, key: &RelationKey) -> Result<Option<Relation>, StoreError>;

    /// Relations touching `name`, ordered by (source, relation_type, target).
    async fn list_relations(
        &self,
        name: &str,
        direction: Direction,
        page: Page,
    ) -> Result<Vec<Relation>, StoreError>;

    /// Execute a raw query in one of [`dialects`](Self::dialects).
    async fn run_query(
        &self,
        dialect: QueryDialect,
        text: &str,
        params: &Metadata,
    ) -> Result<QueryResult, StoreError>;

    /// Native schema introspection. `None` means the backend cannot
    /// introspect and the caller should sample instead.
    async fn fetch_schema(&self) -> Result<Option<GraphSchema>, StoreError>;

    /// Native text search over names, types and metadata.
    async fn search_text(
        &self,
        query: &str,
        mode: TextMatch,
        limit: usize,
    ) -> Result<Vec<ScoredEntity>, StoreError>;

    /// Names of entities whose type and metadata equal every filter entry.
    /// The key `type` filters on the entity type.
    async fn find_entities(&self, filter: &Metadata, limit: usize)
    -> Result<Vec<String>, StoreError>;

    /// Entities in name order, one window at a time.
    async fn list_entities(&self, page: Page) -> Result<Vec<Entity>, StoreError>;

    /// Relations equal to every set field of `filter`, ordered by
    /// (source, relation_type, target).
    async fn find_relations(
        &self,
        filter: &RelationFilter,
        limit: usize,
    ) -> Result<Vec<Relation>, StoreError>;

    /// Store the embedding vector of an entity.
    async fn upsert_embedding(&self, name: &str, vector: &[f32]) -> Result<(), StoreError>;

    /// All stored entity embeddings as `(name, vector)` pairs.
    async fn entity_embeddings(&self) -> Result<Vec<(String, Vec<f32>)>, StoreError>;

    /// Reachability check. Never fails; unreachable stores report
    /// [`Availability::Unavailable`](crate::Availability::Unavailable).
    async fn status(&self) -> StoreStatus;

    /// Release the backend connection.
    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
