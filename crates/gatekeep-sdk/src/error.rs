//! SDK error types

use thiserror::Error;

/// SDK error type
#[derive(Error, Debug)]
pub enum SdkError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Persisted dependency rows do not form a tree
    #[error("Invalid dependency rows: {0}")]
    InvalidDependencyRows(String),

    /// Condition model error
    #[error("Condition error: {0}")]
    CoreError(#[from] gatekeep_core::CoreError),

    /// Evaluation error
    #[error("Runtime error: {0}")]
    RuntimeError(#[from] gatekeep_runtime::RuntimeError),

    /// SQL generation error
    #[error("SQL error: {0}")]
    SqlError(#[from] gatekeep_sql::SqlError),

    /// YAML error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for SDK operations
pub type Result<T> = std::result::Result<T, SdkError>;
