//! Runtime error types

use gatekeep_core::CoreError;
use thiserror::Error;

/// Runtime error
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Invalid tree, unresolvable address or unsupported operator
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The record accessor failed to produce a value
    #[error("Accessor error for '{address}': {reason}")]
    Accessor { address: String, reason: String },

    /// Record data that cannot be turned into an accessor
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;
