//! Search, raw query and status tools.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use graphmem_core::MemoryEngine;
use graphmem_protocols::{
    Availability, Metadata, Mode, QueryDialect, RiskLevel, SearchMode, Tool, ToolDefinition,
    ToolError, ToolResult,
};

use crate::{parse_params, record};

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;

// ---------------------------------------------------------------------------
// search_entities
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchParams {
    query: String,
    #[serde(alias = "limit")]
    top_k: Option<usize>,
    #[serde(default)]
    mode: SearchMode,
}

/// Ranked entity search.
pub struct SearchEntitiesTool {
    definition: ToolDefinition,
    engine: Arc<MemoryEngine>,
}

impl SearchEntitiesTool {
    pub fn new(engine: Arc<MemoryEngine>) -> Self {
        let schema = json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Search text" },
                "top_k": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Maximum number of results"
                },
                "mode": {
                    "type": "string",
                    "enum": ["exact", "fulltext", "semantic", "hybrid"],
                    "description": "Search strategy (default: fulltext). Semantic and hybrid need an embedding provider."
                }
            },
            "required": ["query"]
        });

        Self {
            definition: ToolDefinition::new(
                "search_entities",
                "Search Entities",
                "Search entities by name, type and metadata. Results carry a relevance score between 0 and 1.",
            )
            .with_parameters_schema(schema),
            engine,
        }
    }
}

#[async_trait]
impl Tool for SearchEntitiesTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolResult, ToolError> {
        let params: SearchParams = parse_params(params)?;
        debug!("search_entities: query={:?}, mode={:?}", params.query, params.mode);

        let results = self
            .engine
            .search_entities(&params.query, params.top_k, params.mode)
            .await?;

        Ok(ToolResult::success_json(
            format!("Found {} matching entities", results.len()),
            json!({ "results": results }),
        ))
    }
}

// ---------------------------------------------------------------------------
// run_query
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RunQueryParams {
    dialect: QueryDialect,
    query: String,
    #[serde(default)]
    params: Metadata,
}

/// Raw query passthrough, only available in full mode.
pub struct RunQueryTool {
    definition: ToolDefinition,
    engine: Arc<MemoryEngine>,
}

impl RunQueryTool {
    pub fn new(engine: Arc<MemoryEngine>) -> Self {
        let schema = json!({
            "type": "object",
            "properties": {
                "dialect": {
                    "type": "string",
                    "enum": ["opencypher", "gremlin", "sql"],
                    "description": "Query language; must be supported by the active backend"
                },
                "query": { "type": "string", "description": "Query text" },
                "params": {
                    "type": "object",
                    "description": "Named bind parameters"
                }
            },
            "required": ["dialect", "query"]
        });

        Self {
            definition: ToolDefinition::new(
                "run_query",
                "Run Query",
                "Execute a raw query against the backing store and return its rows.",
            )
            .with_parameters_schema(schema)
            .with_risk_level(RiskLevel::High)
            .with_required_mode(Mode::Full),
            engine,
        }
    }
}

#[async_trait]
impl Tool for RunQueryTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolResult, ToolError> {
        let params: RunQueryParams = parse_params(params)?;
        let result = self
            .engine
            .run_query(params.dialect, &params.query, &params.params)
            .await?;
        Ok(ToolResult::success_json(
            format!("{} row(s)", result.rows.len()),
            record(&result),
        ))
    }
}

// ---------------------------------------------------------------------------
// memory_status
// ---------------------------------------------------------------------------

/// Backend reachability and capabilities.
pub struct MemoryStatusTool {
    definition: ToolDefinition,
    engine: Arc<MemoryEngine>,
}

impl MemoryStatusTool {
    pub fn new(engine: Arc<MemoryEngine>) -> Self {
        Self {
            definition: ToolDefinition::new(
                "memory_status",
                "Memory Status",
                "Report the active backend, whether it is reachable, the engine mode and the supported query dialects.",
            ),
            engine,
        }
    }
}

#[async_trait]
impl Tool for MemoryStatusTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, _params: serde_json::Value) -> Result<ToolResult, ToolError> {
        let status = self.engine.status().await?;
        let reachable = status.availability == Availability::Available;

        let mut output = record(&status);
        output["mode"] = json!(self.engine.mode());
        output["semantic_search"] = json!(self.engine.has_embedder());

        let summary = format!(
            "Backend '{}' is {} (mode: {})",
            status.backend,
            if reachable { "available" } else { "unavailable" },
            self.engine.mode()
        );
        Ok(ToolResult::success_json(summary, output))
    }
}
