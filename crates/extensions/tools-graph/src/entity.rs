//! Entity tools: create, delete, get, schema, find.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use graphmem_core::MemoryEngine;
use graphmem_protocols::{Metadata, Mode, RiskLevel, Tool, ToolDefinition, ToolError, ToolResult};

use crate::{parse_params, record};

#[cfg(test)]
#[path = "entity_tests.rs"]
mod tests;

// ---------------------------------------------------------------------------
// create_entity
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CreateEntityParams {
    name: String,
    #[serde(rename = "type", alias = "entity_type")]
    entity_type: String,
    #[serde(default)]
    metadata: Metadata,
    #[serde(default)]
    observations: Vec<String>,
}

/// Create an entity or merge into an existing one.
pub struct CreateEntityTool {
    definition: ToolDefinition,
    engine: Arc<MemoryEngine>,
}

impl CreateEntityTool {
    pub fn new(engine: Arc<MemoryEngine>) -> Self {
        let schema = json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "Unique, case-sensitive entity name"
                },
                "type": {
                    "type": "string",
                    "description": "Entity category, e.g. Person or Organization"
                },
                "metadata": {
                    "type": "object",
                    "description": "Durable facts; values must be scalars or arrays of scalars. Merged into existing metadata."
                },
                "observations": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Timestamped notes of the form 'YYYY-MM-DD HH:MM[:SS] | text'"
                }
            },
            "required": ["name", "type"]
        });

        Self {
            definition: ToolDefinition::new(
                "create_entity",
                "Create Entity",
                "Create an entity or merge metadata and observations into an existing one. Only the most recent observations are kept.",
            )
            .with_parameters_schema(schema)
            .with_risk_level(RiskLevel::Medium)
            .with_required_mode(Mode::Write),
            engine,
        }
    }
}

#[async_trait]
impl Tool for CreateEntityTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolResult, ToolError> {
        let params: CreateEntityParams = parse_params(params)?;
        debug!("create_entity: name={:?}", params.name);

        let outcome = self
            .engine
            .create_or_merge_entity(
                &params.name,
                &params.entity_type,
                params.metadata,
                &params.observations,
            )
            .await?;

        let entity = &outcome.value;
        let summary = format!(
            "Entity '{}' ({}) saved with {} observation(s)",
            entity.name,
            entity.entity_type,
            entity.observations.len()
        );
        Ok(ToolResult::success_json(summary, record(entity)).with_warnings(outcome.warnings))
    }
}

// ---------------------------------------------------------------------------
// delete_entity
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct NameParams {
    name: String,
}

/// Delete an entity and every relation touching it.
pub struct DeleteEntityTool {
    definition: ToolDefinition,
    engine: Arc<MemoryEngine>,
}

impl DeleteEntityTool {
    pub fn new(engine: Arc<MemoryEngine>) -> Self {
        let schema = json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "Entity to delete" }
            },
            "required": ["name"]
        });

        Self {
            definition: ToolDefinition::new(
                "delete_entity",
                "Delete Entity",
                "Delete an entity together with all of its relations.",
            )
            .with_parameters_schema(schema)
            .with_risk_level(RiskLevel::High)
            .with_required_mode(Mode::Write),
            engine,
        }
    }
}

#[async_trait]
impl Tool for DeleteEntityTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolResult, ToolError> {
        let params: NameParams = parse_params(params)?;
        self.engine.delete_entity(&params.name).await?;
        Ok(ToolResult::success_json(
            format!("Entity '{}' deleted", params.name),
            json!({ "deleted": params.name }),
        ))
    }
}

// ---------------------------------------------------------------------------
// get_entity
// ---------------------------------------------------------------------------

/// Fetch one entity snapshot.
pub struct GetEntityTool {
    definition: ToolDefinition,
    engine: Arc<MemoryEngine>,
}

impl GetEntityTool {
    pub fn new(engine: Arc<MemoryEngine>) -> Self {
        let schema = json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "Entity name" }
            },
            "required": ["name"]
        });

        Self {
            definition: ToolDefinition::new(
                "get_entity",
                "Get Entity",
                "Retrieve an entity with its metadata and newest-first observations.",
            )
            .with_parameters_schema(schema),
            engine,
        }
    }
}

#[async_trait]
impl Tool for GetEntityTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolResult, ToolError> {
        let params: NameParams = parse_params(params)?;
        let entity = self.engine.get_entity(&params.name).await?;
        Ok(ToolResult::success_json(
            format!("Entity '{}' ({})", entity.name, entity.entity_type),
            record(&entity),
        ))
    }
}

// ---------------------------------------------------------------------------
// get_schema
// ---------------------------------------------------------------------------

/// Distinct types and property keys in the graph.
pub struct GetSchemaTool {
    definition: ToolDefinition,
    engine: Arc<MemoryEngine>,
}

impl GetSchemaTool {
    pub fn new(engine: Arc<MemoryEngine>) -> Self {
        Self {
            definition: ToolDefinition::new(
                "get_schema",
                "Get Schema",
                "List the entity types, relation types and property keys currently in memory.",
            )
            .with_parameters_schema(json!({"type": "object", "properties": {}})),
            engine,
        }
    }
}

#[async_trait]
impl Tool for GetSchemaTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, _params: serde_json::Value) -> Result<ToolResult, ToolError> {
        let schema = self.engine.get_schema().await?;
        Ok(ToolResult::success_json(
            format!(
                "{} entity type(s), {} relation type(s)",
                schema.entity_types.len(),
                schema.relation_types.len()
            ),
            record(&schema),
        ))
    }
}

// ---------------------------------------------------------------------------
// find_entities
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FindEntitiesParams {
    filter: Metadata,
}

/// Exact-match lookup on type and metadata.
pub struct FindEntitiesTool {
    definition: ToolDefinition,
    engine: Arc<MemoryEngine>,
}

impl FindEntitiesTool {
    pub fn new(engine: Arc<MemoryEngine>) -> Self {
        let schema = json!({
            "type": "object",
            "properties": {
                "filter": {
                    "type": "object",
                    "description": "Key/value pairs that must all match exactly. The key 'type' matches the entity type."
                }
            },
            "required": ["filter"]
        });

        Self {
            definition: ToolDefinition::new(
                "find_entities",
                "Find Entities",
                "Find entity names whose type and metadata match every filter entry.",
            )
            .with_parameters_schema(schema),
            engine,
        }
    }
}

#[async_trait]
impl Tool for FindEntitiesTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolResult, ToolError> {
        let params: FindEntitiesParams = parse_params(params)?;
        let names = self.engine.find_entities(&params.filter).await?;
        Ok(ToolResult::success_json(
            format!("Found {} matching entities", names.len()),
            json!({ "names": names }),
        ))
    }
}
