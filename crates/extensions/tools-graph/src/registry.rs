//! Tool registry for the engine's tool surface.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, warn};

use graphmem_core::MemoryEngine;
use graphmem_protocols::{Mode, Tool, ToolDefinition, ToolError, ToolResult};

use crate::tools_for_engine;

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;

/// Thread-safe map of tool id to tool.
pub struct ToolRegistry {
    tools: DashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: DashMap::new(),
        }
    }

    /// Registry holding every engine tool.
    pub fn for_engine(engine: Arc<MemoryEngine>) -> Result<Self, ToolError> {
        let registry = Self::new();
        for tool in tools_for_engine(engine) {
            registry.register(tool)?;
        }
        Ok(registry)
    }

    /// Register a tool. Fails if the id is taken.
    pub fn register(&self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        let id = tool.definition().id.clone();
        match self.tools.entry(id) {
            Entry::Occupied(entry) => Err(ToolError::AlreadyRegistered(entry.key().clone())),
            Entry::Vacant(entry) => {
                debug!("Registered tool: {}", entry.key());
                entry.insert(tool);
                Ok(())
            }
        }
    }

    pub fn unregister(&self, id: &str) -> Result<(), ToolError> {
        self.tools
            .remove(id)
            .ok_or_else(|| ToolError::NotFound(id.to_string()))?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(id).map(|tool| tool.clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tools.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// All tool definitions, sorted by id.
    pub fn list(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> = self
            .tools
            .iter()
            .map(|tool| tool.definition().clone())
            .collect();
        definitions.sort_by(|a, b| a.id.cmp(&b.id));
        definitions
    }

    /// Definitions of the tools an engine in `mode` will accept.
    pub fn list_for_mode(&self, mode: Mode) -> Vec<ToolDefinition> {
        self.list()
            .into_iter()
            .filter(|def| mode >= def.required_mode)
            .collect()
    }

    /// Run a tool by id. Every failure is folded into the result as a
    /// `{kind, message}` report.
    pub async fn call(&self, id: &str, params: serde_json::Value) -> ToolResult {
        match self.try_call(id, params).await {
            Ok(result) => result,
            Err(err) => {
                warn!(tool = %id, error = %err, "Tool call failed");
                ToolResult::failure(err.report())
            }
        }
    }

    async fn try_call(&self, id: &str, params: serde_json::Value) -> Result<ToolResult, ToolError> {
        let tool = self
            .get(id)
            .ok_or_else(|| ToolError::NotFound(id.to_string()))?;
        tool.validate(&params)?;
        tool.execute(params).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
