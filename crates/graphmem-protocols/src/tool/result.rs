//! Tool execution result types.

use serde::{Deserialize, Serialize};

use crate::error::{ErrorReport, MaintenanceWarning};

/// Result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the execution was successful.
    pub success: bool,

    /// Short human-readable summary.
    pub content: String,

    /// Structured record returned by the operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_output: Option<serde_json::Value>,

    /// Structured error if execution failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,

    /// Warnings raised after a committed write.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<MaintenanceWarning>,
}

impl ToolResult {
    /// Create a successful result with text content.
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            success: true,
            content: content.into(),
            structured_output: None,
            error: None,
            warnings: Vec::new(),
        }
    }

    /// Create a successful result with structured output.
    pub fn success_json(content: impl Into<String>, output: serde_json::Value) -> Self {
        Self {
            structured_output: Some(output),
            ..Self::success(content)
        }
    }

    /// Create an error result.
    pub fn failure(report: ErrorReport) -> Self {
        Self {
            success: false,
            content: report.message.clone(),
            structured_output: None,
            error: Some(report),
            warnings: Vec::new(),
        }
    }

    /// Attach maintenance warnings.
    pub fn with_warnings(mut self, warnings: Vec<MaintenanceWarning>) -> Self {
        self.warnings = warnings;
        self
    }
}
