//! Shared fixtures for engine tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use graphmem_embedding::HashEmbedding;
use graphmem_protocols::{
    Direction, Embedding, EmbeddingError, EmbeddingProvider, Entity, EntityUpsert, GraphSchema,
    GraphStore, Metadata, Page, QueryDialect, QueryResult, Relation, RelationFilter, RelationKey,
    ScoredEntity,
    SUBGRAPH_TYPE, StoreError, StoreStatus, TextMatch,
};
use graphmem_store_sqlite::SqliteGraphStore;

use crate::{EngineConfig, MemoryEngine};

pub(crate) async fn engine_with(config: EngineConfig) -> MemoryEngine {
    let store = SqliteGraphStore::in_memory().await.unwrap();
    MemoryEngine::new(Arc::new(store), config)
}

pub(crate) async fn engine() -> MemoryEngine {
    engine_with(EngineConfig::default()).await
}

pub(crate) async fn engine_with_embeddings() -> MemoryEngine {
    engine()
        .await
        .with_embedder(Arc::new(HashEmbedding::new(256)))
}

pub(crate) fn metadata(pairs: &[(&str, serde_json::Value)]) -> Metadata {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// SQLite store that can be slowed down, made to hide its schema or made
/// to refuse sub-graph marker writes.
pub(crate) struct WrappedStore {
    inner: SqliteGraphStore,
    delay: Option<Duration>,
    introspect: bool,
    refuse_markers: bool,
}

impl WrappedStore {
    pub(crate) async fn new() -> Self {
        Self {
            inner: SqliteGraphStore::in_memory().await.unwrap(),
            delay: None,
            introspect: true,
            refuse_markers: false,
        }
    }

    pub(crate) fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn without_introspection(mut self) -> Self {
        self.introspect = false;
        self
    }

    pub(crate) fn refusing_markers(mut self) -> Self {
        self.refuse_markers = true;
        self
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl GraphStore for WrappedStore {
    fn id(&self) -> &str {
        "wrapped"
    }

    fn dialects(&self) -> &[QueryDialect] {
        self.inner.dialects()
    }

    async fn upsert_entity(&self, upsert: EntityUpsert) -> Result<Entity, StoreError> {
        self.pause().await;
        if self.refuse_markers && upsert.entity_type.as_deref() == Some(SUBGRAPH_TYPE) {
            return Err(StoreError::Connection("marker write refused".to_string()));
        }
        self.inner.upsert_entity(upsert).await
    }

    async fn upsert_relation(&self, relation: Relation) -> Result<Relation, StoreError> {
        self.pause().await;
        self.inner.upsert_relation(relation).await
    }

    async fn delete_entity(&self, name: &str) -> Result<bool, StoreError> {
        self.pause().await;
        self.inner.delete_entity(name).await
    }

    async fn delete_relation(&self, key: &RelationKey) -> Result<bool, StoreError> {
        self.pause().await;
        self.inner.delete_relation(key).await
    }

    async fn fetch_entity(&self, name: &str) -> Result<Option<Entity>, StoreError> {
        self.pause().await;
        self.inner.fetch_entity(name).await
    }

    async fn fetch_relation(&self, key: &RelationKey) -> Result<Option<Relation>, StoreError> {
        self.pause().await;
        self.inner.fetch_relation(key).await
    }

    async fn list_relations(
        &self,
        name: &str,
        direction: Direction,
        page: Page,
    ) -> Result<Vec<Relation>, StoreError> {
        self.pause().await;
        self.inner.list_relations(name, direction, page).await
    }

    async fn run_query(
        &self,
        dialect: QueryDialect,
        text: &str,
        params: &Metadata,
    ) -> Result<QueryResult, StoreError> {
        self.pause().await;
        self.inner.run_query(dialect, text, params).await
    }

    async fn fetch_schema(&self) -> Result<Option<GraphSchema>, StoreError> {
        self.pause().await;
        if self.introspect {
            self.inner.fetch_schema().await
        } else {
            Ok(None)
        }
    }

    async fn search_text(
        &self,
        query: &str,
        mode: TextMatch,
        limit: usize,
    ) -> Result<Vec<ScoredEntity>, StoreError> {
        self.pause().await;
        self.inner.search_text(query, mode, limit).await
    }

    async fn find_entities(
        &self,
        filter: &Metadata,
        limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        self.pause().await;
        self.inner.find_entities(filter, limit).await
    }

    async fn list_entities(&self, page: Page) -> Result<Vec<Entity>, StoreError> {
        self.pause().await;
        self.inner.list_entities(page).await
    }

    async fn find_relations(
        &self,
        filter: &RelationFilter,
        limit: usize,
    ) -> Result<Vec<Relation>, StoreError> {
        self.pause().await;
        self.inner.find_relations(filter, limit).await
    }

    async fn upsert_embedding(&self, name: &str, vector: &[f32]) -> Result<(), StoreError> {
        self.pause().await;
        self.inner.upsert_embedding(name, vector).await
    }

    async fn entity_embeddings(&self) -> Result<Vec<(String, Vec<f32>)>, StoreError> {
        self.pause().await;
        self.inner.entity_embeddings().await
    }

    async fn status(&self) -> StoreStatus {
        self.pause().await;
        self.inner.status().await
    }
}

/// Provider that always fails.
pub(crate) struct BrokenEmbedder;

#[async_trait]
impl EmbeddingProvider for BrokenEmbedder {
    fn id(&self) -> &str {
        "broken"
    }

    async fn embed(&self, _text: &str) -> Result<Embedding, EmbeddingError> {
        Err(EmbeddingError::Failed("provider unreachable".to_string()))
    }

    fn dimension(&self) -> usize {
        8
    }
}
