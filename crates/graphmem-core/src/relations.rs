//! Relation operations.

use tracing::{debug, info, warn};

use graphmem_protocols::{
    EntityUpsert, MaintenanceWarning, MemoryError, Metadata, Operation, Relation, RelationKey,
    WarningStage, WriteOutcome,
};

use crate::engine::MemoryEngine;
use crate::subgraph::{as_hub_relation, contained_edge};
use crate::validation::{require_non_empty, validate_properties, validate_relation_type};

#[cfg(test)]
#[path = "relations_tests.rs"]
mod tests;

impl MemoryEngine {
    /// Create the endpoint as a bare `Unknown` entity if it is missing.
    async fn ensure_endpoint(
        &self,
        operation: Operation,
        name: &str,
    ) -> Result<Option<MaintenanceWarning>, MemoryError> {
        if self
            .call(operation, self.store.fetch_entity(name))
            .await?
            .is_some()
        {
            return Ok(None);
        }

        let upsert = EntityUpsert::ensure(name).with_cap(self.config.observation_cap);
        let entity = self.call(operation, self.store.upsert_entity(upsert)).await?;
        info!(
            operation = %operation,
            backend = %self.store.id(),
            entity = %entity.name,
            entity_type = %entity.entity_type,
            "Relation endpoint auto-created"
        );
        Ok(self.refresh_embedding(operation, &entity).await)
    }

    /// Create a relation or merge properties into the existing triple.
    ///
    /// Missing endpoints are created as `Unknown` entities. A triple that
    /// was moved into a sub-graph is merged there. The source is then
    /// decomposed if its direct fan-out exceeds the threshold; a failure in
    /// that step is returned as a warning.
    pub async fn create_or_merge_relation(
        &self,
        source: &str,
        target: &str,
        relation_type: &str,
        properties: Metadata,
    ) -> Result<WriteOutcome<Relation>, MemoryError> {
        let operation = Operation::CreateRelation;
        self.gate(operation)?;
        require_non_empty("source", source)?;
        require_non_empty("target", target)?;
        validate_relation_type(relation_type)?;
        validate_properties(&properties)?;

        let mut warnings = Vec::new();
        warnings.extend(self.ensure_endpoint(operation, source).await?);
        if target != source {
            warnings.extend(self.ensure_endpoint(operation, target).await?);
        }

        let key = RelationKey::new(source, target, relation_type);
        if let Some(existing) = self.find_decomposed(operation, &key).await? {
            let merged = self
                .call(
                    operation,
                    self.store
                        .upsert_relation(contained_edge(&existing.source, &key, properties)),
                )
                .await?;
            debug!(relation = %key, subgraph = %existing.source, "Merged into sub-graph edge");
            return Ok(WriteOutcome::with_warnings(
                as_hub_relation(&key, merged),
                warnings,
            ));
        }

        let relation = Relation::new(source, target, relation_type).with_properties(properties);
        let relation = self
            .call(operation, self.store.upsert_relation(relation))
            .await?;
        debug!(
            operation = %operation,
            backend = %self.store.id(),
            relation = %key,
            "Relation committed"
        );

        if let Err(err) = self.decompose(source).await {
            warn!(
                operation = %operation,
                hub = %source,
                error = %err,
                "Relation committed but sub-graph decomposition failed"
            );
            warnings.push(MaintenanceWarning::new(
                WarningStage::SubgraphDecomposition,
                format!("decomposition of '{}' failed: {}", source, err),
            ));
        }

        Ok(WriteOutcome::with_warnings(relation, warnings))
    }

    /// Delete a triple, whether it is a direct edge or was moved into a
    /// sub-graph.
    pub async fn delete_relation(
        &self,
        source: &str,
        target: &str,
        relation_type: &str,
    ) -> Result<(), MemoryError> {
        let operation = Operation::DeleteRelation;
        self.gate(operation)?;
        require_non_empty("source", source)?;
        require_non_empty("target", target)?;
        require_non_empty("relation type", relation_type)?;

        let key = RelationKey::new(source, target, relation_type);
        if self.call(operation, self.store.delete_relation(&key)).await? {
            info!(operation = %operation, backend = %self.store.id(), relation = %key, "Relation deleted");
            return Ok(());
        }

        match self.find_decomposed(operation, &key).await? {
            Some(edge) => {
                self.call(operation, self.store.delete_relation(&edge.key()))
                    .await?;
                info!(
                    operation = %operation,
                    backend = %self.store.id(),
                    relation = %key,
                    subgraph = %edge.source,
                    "Decomposed relation deleted"
                );
                Ok(())
            }
            None => Err(MemoryError::not_found(format!("relation {}", key))),
        }
    }
}
