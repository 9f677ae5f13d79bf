//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent malformed input or violated tree-set invariants.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("parse error at line {line}, column {column}: {message} (near `{fragment}`)")]
    Parse {
        line: usize,
        column: usize,
        fragment: String,
        message: String,
    },

    #[error("duplicate tree name: {0}")]
    DuplicateTree(String),

    #[error("no trees found in input")]
    NoTrees,

    #[error("trees {left} and {right} do not share leaves: {}", labels.join(", "))]
    UnmatchedLeaves {
        left: String,
        right: String,
        labels: Vec<String>,
    },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
