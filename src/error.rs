//! Error types for Sextant
//!
//! Every failure the engine can surface is a variant here, so callers
//! pattern-match instead of parsing messages. Exploratory traversals
//! (impact/ancestors/neighbors on a missing id) do not error at all; they
//! degrade to empty results. Nothing is retried internally.

use thiserror::Error;

/// Virtual table names the relational surface accepts.
pub const VALID_TABLES: &[&str] = &["functions", "classes", "modules", "methods", "nodes"];

pub type Result<T> = std::result::Result<T, QueryError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// Syntax problem in the query string. Position is a byte offset.
    #[error("parse error at offset {position}: {message}")]
    Parse { position: usize, message: String },

    /// Unknown virtual table name.
    #[error("unknown table '{name}' (valid tables: functions, classes, modules, methods, nodes)")]
    UnknownTable { name: String },

    /// A human-typed reference matched no node in any resolution tier.
    #[error("node not found: '{reference}'")]
    NodeNotFound { reference: String },

    /// A reference matched several nodes under `Strict` resolution.
    #[error("ambiguous reference '{reference}': candidates {candidates:?}")]
    AmbiguousNode {
        reference: String,
        candidates: Vec<String>,
    },

    /// A shortest-path or cycle query named an id absent from the store.
    #[error("graph target not found: '{id}'")]
    TargetNotFound { id: String },

    /// Relational-shape problem caught before execution (bad GROUP BY or
    /// HAVING reference).
    #[error("planning error: {message}")]
    Plan { message: String },
}

impl QueryError {
    pub(crate) fn parse(position: usize, message: impl Into<String>) -> Self {
        QueryError::Parse {
            position,
            message: message.into(),
        }
    }

    pub(crate) fn plan(message: impl Into<String>) -> Self {
        QueryError::Plan {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_table_lists_valid_names() {
        let err = QueryError::UnknownTable {
            name: "tables".to_string(),
        };
        let text = err.to_string();
        for valid in VALID_TABLES {
            assert!(text.contains(valid), "message should name '{}'", valid);
        }
    }

    #[test]
    fn test_parse_error_carries_position() {
        let err = QueryError::parse(17, "unexpected token");
        assert_eq!(
            err,
            QueryError::Parse {
                position: 17,
                message: "unexpected token".to_string()
            }
        );
        assert!(err.to_string().contains("offset 17"));
    }
}
