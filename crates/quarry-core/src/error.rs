//! Error types for Quarry.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("unknown env field: '{0}'")]
    UnknownField(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("duplicate definition: {0}")]
    Duplicate(String),

    #[error("invalid parameter: {0}")]
    Parameter(String),

    #[error("cycle detected while resolving '{key}': {}", .chain.join(" -> "))]
    Cycle { key: String, chain: Vec<String> },

    #[error("unresolved reference: {0}")]
    UnresolvedReference(String),

    #[error("expected a single value for '{key}', found {count}")]
    ShapeMismatch { key: String, count: usize },

    #[error("criteria matched no registered mapping: {0}")]
    NoMatch(String),
}

pub type Result<T> = std::result::Result<T, Error>;
