//! # graphmem Graph Tools
//!
//! Every memory engine operation as an agent-callable [`Tool`]. Tools parse
//! JSON parameters, call the engine and return JSON records; engine errors
//! come back as `{kind, message}` reports through [`ToolRegistry::call`].

mod entity;
mod query;
mod registry;
mod relation;

use std::sync::Arc;

use graphmem_core::MemoryEngine;
use graphmem_protocols::{Tool, ToolError};
use serde::Serialize;
use serde::de::DeserializeOwned;

pub use entity::{
    CreateEntityTool, DeleteEntityTool, FindEntitiesTool, GetEntityTool, GetSchemaTool,
};
pub use query::{MemoryStatusTool, RunQueryTool, SearchEntitiesTool};
pub use registry::ToolRegistry;
pub use relation::{
    CreateRelationTool, DeleteRelationTool, FindRelationsTool, ListRelationsTool, ReadGraphTool,
    ReadNeighborhoodTool,
};

/// One tool per engine operation, all sharing `engine`.
pub fn tools_for_engine(engine: Arc<MemoryEngine>) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(CreateEntityTool::new(engine.clone())),
        Arc::new(DeleteEntityTool::new(engine.clone())),
        Arc::new(GetEntityTool::new(engine.clone())),
        Arc::new(CreateRelationTool::new(engine.clone())),
        Arc::new(DeleteRelationTool::new(engine.clone())),
        Arc::new(ListRelationsTool::new(engine.clone())),
        Arc::new(SearchEntitiesTool::new(engine.clone())),
        Arc::new(GetSchemaTool::new(engine.clone())),
        Arc::new(RunQueryTool::new(engine.clone())),
        Arc::new(ReadNeighborhoodTool::new(engine.clone())),
        Arc::new(FindEntitiesTool::new(engine.clone())),
        Arc::new(FindRelationsTool::new(engine.clone())),
        Arc::new(ReadGraphTool::new(engine.clone())),
        Arc::new(MemoryStatusTool::new(engine)),
    ]
}

pub(crate) fn parse_params<T: DeserializeOwned>(params: serde_json::Value) -> Result<T, ToolError> {
    serde_json::from_value(params).map_err(|e| ToolError::InvalidParameters(e.to_string()))
}

pub(crate) fn record<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}
