//! The memory engine.
//!
//! [`MemoryEngine`] sits between the tool surface and a [`GraphStore`]. Every
//! public operation passes the mode gate, validates its input, then calls the
//! store under the configured timeout. Post-commit maintenance (embeddings,
//! sub-graph decomposition) never fails a committed write; it is reported as a
//! [`MaintenanceWarning`] instead.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use graphmem_protocols::{
    Availability, CONTAINS_SUBGRAPH, Direction, Embedding, EmbeddingError, EmbeddingProvider,
    Entity, EntityUpsert, GraphSchema, GraphStore, MaintenanceWarning, MemoryError, Metadata, Mode,
    Operation, Page, QueryDialect, QueryResult, Relation, StoreError, StoreStatus, WarningStage,
    WriteOutcome,
};

use crate::config::EngineConfig;
use crate::schema::derive_schema;
use crate::validation::{
    parse_observations, require_non_empty, validate_entity_type, validate_filter,
    validate_metadata,
};

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;

/// Entities sampled when the store cannot introspect its schema.
const SCHEMA_SAMPLE_SIZE: usize = 200;

/// Upper bound on results of the `find_*` lookups and on a graph page.
pub(crate) const MAX_FIND_RESULTS: usize = 1000;

/// Run a store call under `timeout`, attaching operation and backend context
/// to any failure.
pub(crate) async fn bounded<T>(
    backend: &str,
    operation: Operation,
    timeout: Duration,
    call: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, MemoryError> {
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(StoreError::Timeout { timeout_ms })) => {
            warn!(operation = %operation, backend, timeout_ms, "Store request timed out");
            Err(MemoryError::BackendTimeout {
                operation,
                backend: backend.to_string(),
                timeout_ms,
            })
        }
        Ok(Err(source)) => {
            debug!(operation = %operation, backend, error = %source, "Store call failed");
            Err(MemoryError::Backend {
                operation,
                backend: backend.to_string(),
                source,
            })
        }
        Err(_) => {
            let timeout_ms = timeout.as_millis() as u64;
            warn!(operation = %operation, backend, timeout_ms, "Store call timed out");
            Err(MemoryError::BackendTimeout {
                operation,
                backend: backend.to_string(),
                timeout_ms,
            })
        }
    }
}

/// Backend-agnostic knowledge-graph memory.
///
/// Holds no mutable state of its own and can be shared across tasks behind
/// an `Arc`.
pub struct MemoryEngine {
    pub(crate) store: Arc<dyn GraphStore>,
    pub(crate) embedder: Option<Arc<dyn EmbeddingProvider>>,
    pub(crate) config: EngineConfig,
}

impl MemoryEngine {
    pub fn new(store: Arc<dyn GraphStore>, config: EngineConfig) -> Self {
        Self {
            store,
            embedder: None,
            config,
        }
    }

    /// Attach the provider used for entity embeddings and semantic search.
    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn backend(&self) -> &str {
        self.store.id()
    }

    pub fn has_embedder(&self) -> bool {
        self.embedder.is_some()
    }

    pub(crate) fn gate(&self, operation: Operation) -> Result<(), MemoryError> {
        if self.config.mode.permits(operation) {
            Ok(())
        } else {
            debug!(operation = %operation, mode = %self.config.mode, "Operation rejected by mode gate");
            Err(MemoryError::NotPermitted {
                operation,
                mode: self.config.mode,
            })
        }
    }

    pub(crate) async fn call<T>(
        &self,
        operation: Operation,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, MemoryError> {
        bounded(self.store.id(), operation, self.config.operation_timeout, call).await
    }

    pub(crate) async fn embed(
        &self,
        operation: Operation,
        provider: &dyn EmbeddingProvider,
        text: &str,
    ) -> Result<Embedding, MemoryError> {
        let timeout = self.config.operation_timeout;
        let result = match tokio::time::timeout(timeout, provider.embed(text)).await {
            Ok(result) => result,
            Err(_) => Err(EmbeddingError::Failed(format!(
                "timed out after {}ms",
                timeout.as_millis()
            ))),
        };
        result.map_err(|source| MemoryError::Embedding {
            operation,
            provider: provider.id().to_string(),
            source,
        })
    }

    /// Every relation of `name` in `direction`, paging until a short page.
    pub(crate) async fn all_relations(
        &self,
        operation: Operation,
        name: &str,
        direction: Direction,
    ) -> Result<Vec<Relation>, MemoryError> {
        let mut page = Page::first(self.config.relation_page_size);
        let mut out = Vec::new();
        loop {
            let batch = self
                .call(operation, self.store.list_relations(name, direction, page))
                .await?;
            let done = batch.len() < page.limit;
            out.extend(batch);
            if done {
                return Ok(out);
            }
            page = page.next();
        }
    }

    /// Names of the sub-graphs hanging off `hub`.
    pub(crate) async fn subgraphs_of(
        &self,
        operation: Operation,
        hub: &str,
    ) -> Result<Vec<String>, MemoryError> {
        Ok(self
            .all_relations(operation, hub, Direction::Outgoing)
            .await?
            .into_iter()
            .filter(|r| r.relation_type == CONTAINS_SUBGRAPH)
            .map(|r| r.target)
            .collect())
    }

    /// Recompute and store the embedding of a committed entity.
    pub(crate) async fn refresh_embedding(
        &self,
        operation: Operation,
        entity: &Entity,
    ) -> Option<MaintenanceWarning> {
        let provider = self.embedder.as_ref()?;
        if entity.is_subgraph() {
            return None;
        }

        let stored = async {
            let embedding = self
                .embed(operation, provider.as_ref(), &entity.embedding_text())
                .await?;
            self.call(
                operation,
                self.store.upsert_embedding(&entity.name, &embedding.vector),
            )
            .await
        }
        .await;

        match stored {
            Ok(()) => None,
            Err(err) => {
                warn!(
                    operation = %operation,
                    entity = %entity.name,
                    error = %err,
                    "Entity committed but its embedding was not stored"
                );
                Some(MaintenanceWarning::new(
                    WarningStage::Embedding,
                    format!("embedding for '{}' not stored: {}", entity.name, err),
                ))
            }
        }
    }

    /// Create an entity or merge into an existing one.
    ///
    /// Metadata keys are merged with new values winning; each observation is
    /// appended to the bounded log in the order given. The type always
    /// replaces the stored one.
    pub async fn create_or_merge_entity(
        &self,
        name: &str,
        entity_type: &str,
        metadata: Metadata,
        observations: &[String],
    ) -> Result<WriteOutcome<Entity>, MemoryError> {
        let operation = Operation::CreateEntity;
        self.gate(operation)?;
        require_non_empty("entity name", name)?;
        validate_entity_type(entity_type)?;
        validate_metadata(&metadata)?;
        let observations = parse_observations(observations)?;
        let appended = observations.len();

        let upsert = EntityUpsert::new(name, entity_type)
            .with_metadata(metadata)
            .with_observations(observations)
            .with_cap(self.config.observation_cap);
        let entity = self.call(operation, self.store.upsert_entity(upsert)).await?;
        debug!(
            operation = %operation,
            backend = %self.store.id(),
            entity = %entity.name,
            appended,
            kept = entity.observations.len(),
            "Entity committed"
        );

        let warnings = self
            .refresh_embedding(operation, &entity)
            .await
            .into_iter()
            .collect();
        Ok(WriteOutcome::with_warnings(entity, warnings))
    }

    /// Delete an entity, every relation touching it and its sub-graphs.
    pub async fn delete_entity(&self, name: &str) -> Result<(), MemoryError> {
        let operation = Operation::DeleteEntity;
        self.gate(operation)?;
        require_non_empty("entity name", name)?;

        let subgraphs = self.subgraphs_of(operation, name).await?;
        if !self.call(operation, self.store.delete_entity(name)).await? {
            return Err(MemoryError::not_found(format!("entity '{}'", name)));
        }
        for subgraph in &subgraphs {
            self.call(operation, self.store.delete_entity(subgraph)).await?;
        }

        info!(
            operation = %operation,
            backend = %self.store.id(),
            entity = %name,
            subgraphs = subgraphs.len(),
            "Entity deleted"
        );
        Ok(())
    }

    pub async fn get_entity(&self, name: &str) -> Result<Entity, MemoryError> {
        let operation = Operation::GetEntity;
        self.gate(operation)?;
        require_non_empty("entity name", name)?;

        self.call(operation, self.store.fetch_entity(name))
            .await?
            .ok_or_else(|| MemoryError::not_found(format!("entity '{}'", name)))
    }

    /// Distinct entity types, relation types and property keys.
    ///
    /// Falls back to sampling when the store cannot introspect.
    pub async fn get_schema(&self) -> Result<GraphSchema, MemoryError> {
        let operation = Operation::GetSchema;
        self.gate(operation)?;

        if let Some(schema) = self.call(operation, self.store.fetch_schema()).await? {
            return Ok(schema.normalize());
        }

        let entities = self
            .call(
                operation,
                self.store.list_entities(Page::first(SCHEMA_SAMPLE_SIZE)),
            )
            .await?;
        let mut relations = Vec::new();
        for entity in &entities {
            let first = Page::first(self.config.relation_page_size);
            relations.extend(
                self.call(
                    operation,
                    self.store
                        .list_relations(&entity.name, Direction::Outgoing, first),
                )
                .await?,
            );
        }
        debug!(
            operation = %operation,
            backend = %self.store.id(),
            sampled = entities.len(),
            "Schema derived by sampling"
        );
        Ok(derive_schema(&entities, &relations))
    }

    /// Names of entities matching every filter entry, in lexical order.
    pub async fn find_entities(&self, filter: &Metadata) -> Result<Vec<String>, MemoryError> {
        let operation = Operation::FindEntities;
        self.gate(operation)?;
        validate_filter(filter)?;

        let mut names = self
            .call(
                operation,
                self.store.find_entities(filter, MAX_FIND_RESULTS),
            )
            .await?;
        names.sort();
        Ok(names)
    }

    /// Execute a raw query in one of the backend's dialects.
    pub async fn run_query(
        &self,
        dialect: QueryDialect,
        text: &str,
        params: &Metadata,
    ) -> Result<QueryResult, MemoryError> {
        let operation = Operation::RunQuery;
        self.gate(operation)?;
        require_non_empty("query", text)?;

        let supported = self.store.dialects();
        if !supported.contains(&dialect) {
            let names: Vec<String> = supported.iter().map(|d| d.to_string()).collect();
            return Err(MemoryError::validation(format!(
                "dialect '{}' is not supported by backend '{}' (supported: {})",
                dialect,
                self.store.id(),
                names.join(", ")
            )));
        }

        let result = self
            .call(operation, self.store.run_query(dialect, text, params))
            .await?;
        info!(
            operation = %operation,
            backend = %self.store.id(),
            dialect = %dialect,
            rows = result.rows.len(),
            "Raw query executed"
        );
        Ok(result)
    }

    /// Reachability of the store. A store that does not answer in time is
    /// reported unavailable.
    pub async fn status(&self) -> Result<StoreStatus, MemoryError> {
        self.gate(Operation::Status)?;
        match tokio::time::timeout(self.config.operation_timeout, self.store.status()).await {
            Ok(status) => Ok(status),
            Err(_) => Ok(StoreStatus {
                backend: self.store.id().to_string(),
                availability: Availability::Unavailable,
                dialects: self.store.dialects().to_vec(),
                detail: Some(format!(
                    "status check timed out after {}ms",
                    self.config.operation_timeout.as_millis()
                )),
            }),
        }
    }

    /// Release the store. Later calls fail with backend errors.
    pub async fn close(&self) -> Result<(), StoreError> {
        info!(backend = %self.store.id(), "Closing memory engine");
        self.store.close().await
    }
}
