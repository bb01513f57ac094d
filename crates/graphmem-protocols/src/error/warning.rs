//! Partial-success reporting.

use serde::{Deserialize, Serialize};

use super::ErrorKind;

/// Post-commit maintenance step that can fail without undoing the write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningStage {
    SubgraphDecomposition,
    Embedding,
}

/// Warning-level error attached to a committed write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceWarning {
    pub kind: ErrorKind,
    pub stage: WarningStage,
    pub message: String,
}

impl MaintenanceWarning {
    pub fn new(stage: WarningStage, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::MaintenanceWarning,
            stage,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for MaintenanceWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} failed after commit: {}", self.stage, self.message)
    }
}

/// Result of a committed write plus any maintenance warnings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteOutcome<T> {
    pub value: T,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<MaintenanceWarning>,
}

impl<T> WriteOutcome<T> {
    pub fn clean(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(value: T, warnings: Vec<MaintenanceWarning>) -> Self {
        Self { value, warnings }
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> WriteOutcome<U> {
        WriteOutcome {
            value: f(self.value),
            warnings: self.warnings,
        }
    }
}
