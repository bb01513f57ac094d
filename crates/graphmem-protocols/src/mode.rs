//! Operation gating.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse permission level of an engine instance.
///
/// Levels are cumulative: `write` allows everything `read` does and `full`
/// additionally allows raw queries.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Read,
    #[default]
    Write,
    Full,
}

impl Mode {
    pub fn permits(&self, operation: Operation) -> bool {
        *self >= operation.required_mode()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "read" | "readonly" | "read-only" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            "full" | "debug" => Ok(Self::Full),
            other => Err(format!("unknown mode '{}', expected read, write or full", other)),
        }
    }
}

/// Engine operations, as seen by the mode gate and in error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateEntity,
    DeleteEntity,
    GetEntity,
    GetSchema,
    CreateRelation,
    DeleteRelation,
    ListRelations,
    SearchEntities,
    ReadNeighborhood,
    FindEntities,
    FindRelations,
    ReadGraph,
    RunQuery,
    Status,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateEntity => "create_or_merge_entity",
            Self::DeleteEntity => "delete_entity",
            Self::GetEntity => "get_entity",
            Self::GetSchema => "get_schema",
            Self::CreateRelation => "create_or_merge_relation",
            Self::DeleteRelation => "delete_relation",
            Self::ListRelations => "list_relations",
            Self::SearchEntities => "search_entities",
            Self::ReadNeighborhood => "read_neighborhood",
            Self::FindEntities => "find_entities",
            Self::FindRelations => "find_relations",
            Self::ReadGraph => "read_graph",
            Self::RunQuery => "run_query",
            Self::Status => "status",
        }
    }

    pub fn required_mode(&self) -> Mode {
        match self {
            Self::CreateEntity
            | Self::DeleteEntity
            | Self::CreateRelation
            | Self::DeleteRelation => Mode::Write,
            Self::RunQuery => Mode::Full,
            _ => Mode::Read,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_mode_permits_only_reads() {
        assert!(Mode::Read.permits(Operation::GetEntity));
        assert!(Mode::Read.permits(Operation::SearchEntities));
        assert!(Mode::Read.permits(Operation::GetSchema));
        assert!(Mode::Read.permits(Operation::ReadGraph));
        assert!(Mode::Read.permits(Operation::FindRelations));
        assert!(!Mode::Read.permits(Operation::CreateEntity));
        assert!(!Mode::Read.permits(Operation::DeleteRelation));
        assert!(!Mode::Read.permits(Operation::RunQuery));
    }

    #[test]
    fn test_write_mode_excludes_raw_queries() {
        assert!(Mode::Write.permits(Operation::CreateRelation));
        assert!(Mode::Write.permits(Operation::ListRelations));
        assert!(!Mode::Write.permits(Operation::RunQuery));
    }

    #[test]
    fn test_full_mode_permits_everything() {
        for op in [
            Operation::CreateEntity,
            Operation::DeleteEntity,
            Operation::RunQuery,
            Operation::Status,
        ] {
            assert!(Mode::Full.permits(op));
        }
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("READ".parse::<Mode>().unwrap(), Mode::Read);
        assert_eq!("debug".parse::<Mode>().unwrap(), Mode::Full);
        assert!("admin".parse::<Mode>().is_err());
    }

    #[test]
    fn test_mode_default_is_write() {
        assert_eq!(Mode::default(), Mode::Write);
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(Operation::CreateEntity.to_string(), "create_or_merge_entity");
        assert_eq!(Operation::RunQuery.name(), "run_query");
    }
}
