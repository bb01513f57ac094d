//! Common utility types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Open property map used for entity metadata and relation properties.
pub type Metadata = HashMap<String, serde_json::Value>;

/// Risk level of an operation exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl Default for RiskLevel {
    fn default() -> Self {
        Self::Low
    }
}

/// Returns true if the value may be stored as a metadata or property value:
/// a scalar, or an array of scalars.
pub fn is_storable_value(value: &serde_json::Value) -> bool {
    use serde_json::Value;
    match value {
        Value::Object(_) => false,
        Value::Array(items) => items
            .iter()
            .all(|item| !matches!(item, Value::Object(_) | Value::Array(_))),
        _ => true,
    }
}

#[cfg(test)]
#[path = "common_tests.rs"]
mod tests;
