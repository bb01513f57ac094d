//! Relation tools: create, delete, list, filter, neighborhood and graph pages.

use std::sync::Arc;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use graphmem_core::{MAX_NEIGHBORHOOD_DEPTH, MemoryEngine};
use graphmem_protocols::{
    Direction, Metadata, Mode, Relation, RelationFilter, RiskLevel, Tool, ToolDefinition,
    ToolError, ToolResult,
};

use crate::{parse_params, record};

#[cfg(test)]
#[path = "relation_tests.rs"]
mod tests;

#[derive(Debug, Deserialize)]
struct TripleParams {
    source: String,
    target: String,
    #[serde(alias = "type")]
    relation_type: String,
}

fn triple_schema(extra: Option<(&str, serde_json::Value)>) -> serde_json::Value {
    let mut schema = json!({
        "type": "object",
        "properties": {
            "source": { "type": "string", "description": "Source entity name" },
            "target": { "type": "string", "description": "Target entity name" },
            "relation_type": {
                "type": "string",
                "description": "Relation type, e.g. WORKS_AT"
            }
        },
        "required": ["source", "target", "relation_type"]
    });
    if let Some((key, value)) = extra {
        schema["properties"][key] = value;
    }
    schema
}

// ---------------------------------------------------------------------------
// create_relation
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CreateRelationParams {
    source: String,
    target: String,
    #[serde(alias = "type")]
    relation_type: String,
    #[serde(default)]
    properties: Metadata,
}

/// Create a relation or merge properties into an existing one.
pub struct CreateRelationTool {
    definition: ToolDefinition,
    engine: Arc<MemoryEngine>,
}

impl CreateRelationTool {
    pub fn new(engine: Arc<MemoryEngine>) -> Self {
        let schema = triple_schema(Some((
            "properties",
            json!({
                "type": "object",
                "description": "Edge properties; values must be scalars or arrays of scalars"
            }),
        )));

        Self {
            definition: ToolDefinition::new(
                "create_relation",
                "Create Relation",
                "Create a directed relation between two entities, creating missing endpoints as type Unknown.",
            )
            .with_parameters_schema(schema)
            .with_risk_level(RiskLevel::Medium)
            .with_required_mode(Mode::Write),
            engine,
        }
    }
}

#[async_trait]
impl Tool for CreateRelationTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolResult, ToolError> {
        let params: CreateRelationParams = parse_params(params)?;
        debug!(
            "create_relation: {} -[{}]-> {}",
            params.source, params.relation_type, params.target
        );

        let outcome = self
            .engine
            .create_or_merge_relation(
                &params.source,
                &params.target,
                &params.relation_type,
                params.properties,
            )
            .await?;

        let relation = &outcome.value;
        let summary = format!(
            "Relation {} -[{}]-> {} saved",
            relation.source, relation.relation_type, relation.target
        );
        Ok(ToolResult::success_json(summary, record(relation)).with_warnings(outcome.warnings))
    }
}

// ---------------------------------------------------------------------------
// delete_relation
// ---------------------------------------------------------------------------

/// Delete one relation triple.
pub struct DeleteRelationTool {
    definition: ToolDefinition,
    engine: Arc<MemoryEngine>,
}

impl DeleteRelationTool {
    pub fn new(engine: Arc<MemoryEngine>) -> Self {
        Self {
            definition: ToolDefinition::new(
                "delete_relation",
                "Delete Relation",
                "Delete the relation identified by source, target and type.",
            )
            .with_parameters_schema(triple_schema(None))
            .with_risk_level(RiskLevel::Medium)
            .with_required_mode(Mode::Write),
            engine,
        }
    }
}

#[async_trait]
impl Tool for DeleteRelationTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolResult, ToolError> {
        let triple: TripleParams = parse_params(params)?;
        self.engine
            .delete_relation(&triple.source, &triple.target, &triple.relation_type)
            .await?;
        Ok(ToolResult::success_json(
            format!(
                "Relation {} -[{}]-> {} deleted",
                triple.source, triple.relation_type, triple.target
            ),
            json!({
                "source": triple.source,
                "target": triple.target,
                "relation_type": triple.relation_type,
            }),
        ))
    }
}

// ---------------------------------------------------------------------------
// list_relations
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ListRelationsParams {
    name: String,
    #[serde(default)]
    direction: Direction,
    limit: Option<usize>,
}

/// Relations of one entity, drained from the engine's paged stream.
pub struct ListRelationsTool {
    definition: ToolDefinition,
    engine: Arc<MemoryEngine>,
}

impl ListRelationsTool {
    pub fn new(engine: Arc<MemoryEngine>) -> Self {
        let schema = json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "Entity name" },
                "direction": {
                    "type": "string",
                    "enum": ["outgoing", "incoming", "both"],
                    "description": "Which edges to list (default: outgoing)"
                },
                "limit": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Stop after this many relations"
                }
            },
            "required": ["name"]
        });

        Self {
            definition: ToolDefinition::new(
                "list_relations",
                "List Relations",
                "List the relations of an entity ordered by source, type and target.",
            )
            .with_parameters_schema(schema),
            engine,
        }
    }
}

#[async_trait]
impl Tool for ListRelationsTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolResult, ToolError> {
        let params: ListRelationsParams = parse_params(params)?;
        if params.limit == Some(0) {
            return Err(ToolError::ValidationFailed("limit must be at least 1".into()));
        }

        let stream = self.engine.list_relations(&params.name, params.direction)?;
        let relations: Vec<Relation> = match params.limit {
            Some(limit) => stream.take(limit).try_collect().await?,
            None => stream.try_collect().await?,
        };

        Ok(ToolResult::success_json(
            format!("{} relation(s) for '{}'", relations.len(), params.name),
            json!({ "relations": relations }),
        ))
    }
}

// ---------------------------------------------------------------------------
// find_relations
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FindRelationsParams {
    source: Option<String>,
    target: Option<String>,
    #[serde(alias = "type")]
    relation_type: Option<String>,
}

/// Relations matching any combination of source, target and type.
pub struct FindRelationsTool {
    definition: ToolDefinition,
    engine: Arc<MemoryEngine>,
}

impl FindRelationsTool {
    pub fn new(engine: Arc<MemoryEngine>) -> Self {
        let schema = json!({
            "type": "object",
            "properties": {
                "source": { "type": "string", "description": "Exact source entity name" },
                "target": { "type": "string", "description": "Exact target entity name" },
                "relation_type": { "type": "string", "description": "Exact relation type" }
            }
        });

        Self {
            definition: ToolDefinition::new(
                "find_relations",
                "Find Relations",
                "Find relations whose source, target and type equal the given values. At least one field is required.",
            )
            .with_parameters_schema(schema),
            engine,
        }
    }
}

#[async_trait]
impl Tool for FindRelationsTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolResult, ToolError> {
        let params: FindRelationsParams = parse_params(params)?;
        let filter = RelationFilter {
            source: params.source,
            target: params.target,
            relation_type: params.relation_type,
        };
        let relations = self.engine.find_relations(&filter).await?;
        Ok(ToolResult::success_json(
            format!("{} matching relation(s)", relations.len()),
            json!({ "relations": relations }),
        ))
    }
}

// ---------------------------------------------------------------------------
// read_graph
// ---------------------------------------------------------------------------

fn default_page_limit() -> usize {
    100
}

#[derive(Debug, Deserialize)]
struct ReadGraphParams {
    #[serde(default)]
    offset: usize,
    #[serde(default = "default_page_limit")]
    limit: usize,
}

/// The whole graph, one page of entities at a time.
pub struct ReadGraphTool {
    definition: ToolDefinition,
    engine: Arc<MemoryEngine>,
}

impl ReadGraphTool {
    pub fn new(engine: Arc<MemoryEngine>) -> Self {
        let schema = json!({
            "type": "object",
            "properties": {
                "offset": {
                    "type": "integer",
                    "minimum": 0,
                    "description": "Entities to skip, in name order (default: 0)"
                },
                "limit": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": 1000,
                    "description": "Entities per page (default: 100)"
                }
            }
        });

        Self {
            definition: ToolDefinition::new(
                "read_graph",
                "Read Graph",
                "Return a page of entities in name order with their outgoing relations, and the offset of the next page if any.",
            )
            .with_parameters_schema(schema),
            engine,
        }
    }
}

#[async_trait]
impl Tool for ReadGraphTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolResult, ToolError> {
        let params: ReadGraphParams = parse_params(params)?;
        let page = self.engine.read_graph(params.offset, params.limit).await?;
        Ok(ToolResult::success_json(
            format!(
                "{} entities and {} relation(s) from offset {}",
                page.entities.len(),
                page.relations.len(),
                params.offset
            ),
            record(&page),
        ))
    }
}

// ---------------------------------------------------------------------------
// read_neighborhood
// ---------------------------------------------------------------------------

fn default_depth() -> usize {
    1
}

#[derive(Debug, Deserialize)]
struct NeighborhoodParams {
    names: Vec<String>,
    #[serde(default = "default_depth")]
    depth: usize,
}

/// Entities within a few hops of a seed set.
pub struct ReadNeighborhoodTool {
    definition: ToolDefinition,
    engine: Arc<MemoryEngine>,
}

impl ReadNeighborhoodTool {
    pub fn new(engine: Arc<MemoryEngine>) -> Self {
        let schema = json!({
            "type": "object",
            "properties": {
                "names": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Seed entity names"
                },
                "depth": {
                    "type": "integer",
                    "minimum": 0,
                    "maximum": MAX_NEIGHBORHOOD_DEPTH,
                    "description": "Hops to follow in either direction (default: 1)"
                }
            },
            "required": ["names"]
        });

        Self {
            definition: ToolDefinition::new(
                "read_neighborhood",
                "Read Neighborhood",
                "Return the seed entities, their neighbors within the given depth, and the relations among them.",
            )
            .with_parameters_schema(schema),
            engine,
        }
    }
}

#[async_trait]
impl Tool for ReadNeighborhoodTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolResult, ToolError> {
        let params: NeighborhoodParams = parse_params(params)?;
        let neighborhood = self
            .engine
            .read_neighborhood(&params.names, params.depth)
            .await?;
        Ok(ToolResult::success_json(
            format!(
                "{} entities and {} relation(s)",
                neighborhood.entities.len(),
                neighborhood.relations.len()
            ),
            record(&neighborhood),
        ))
    }
}
