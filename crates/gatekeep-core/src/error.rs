//! Error types for gatekeep Core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Malformed condition tree (empty group, missing value, blank address)
    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    /// A field address could not be mapped to a root and path
    #[error("Field resolution failed for '{address}': {reason}")]
    FieldResolution { address: String, reason: String },

    /// Operator missing from the registry or unknown operator name
    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),
}

impl CoreError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        CoreError::InvalidCondition(msg.into())
    }

    pub(crate) fn resolution(address: &str, reason: impl Into<String>) -> Self {
        CoreError::FieldResolution {
            address: address.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
