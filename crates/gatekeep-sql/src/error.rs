//! SQL generation error types

use gatekeep_core::CoreError;
use thiserror::Error;

/// SQL generation error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SqlError {
    /// Invalid tree or unresolvable address
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Operator not registered, or not expressible in this dialect
    #[error("Unsupported operator '{operator}' for dialect {dialect}")]
    UnsupportedOperator { operator: String, dialect: String },

    /// The tree cannot be lowered to SQL
    #[error("SQL translation failed: {0}")]
    Translation(String),

    /// Malformed partition spec
    #[error("Invalid partition spec: {0}")]
    InvalidPartition(String),

    /// Unknown dialect name
    #[error("Unknown dialect: {0}")]
    UnknownDialect(String),
}

impl SqlError {
    pub(crate) fn translation(msg: impl Into<String>) -> Self {
        SqlError::Translation(msg.into())
    }

    pub(crate) fn partition(msg: impl Into<String>) -> Self {
        SqlError::InvalidPartition(msg.into())
    }
}

/// Result type for SQL generation
pub type Result<T> = std::result::Result<T, SqlError>;
