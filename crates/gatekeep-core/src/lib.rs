//! gatekeep Core - condition model and shared building blocks
//!
//! This crate provides the types shared by the in-memory evaluator and the
//! SQL translator:
//! - Value types for record data and comparison operands
//! - The condition tree (leaves and AND/OR groups) with validating constructors
//! - The operator registry (in-memory comparison + SQL shape per operator)
//! - Field-address resolution against a caller-supplied schema catalog
//! - Error types

pub mod condition;
pub mod error;
pub mod field;
pub mod registry;
pub mod types;

// Re-export commonly used types
pub use condition::{ConditionGroup, ConditionLeaf, ConditionNode, GroupOperator, Operator};
pub use error::{CoreError, Result};
pub use field::{
    FieldResolver, JoinOn, PartitionSpec, Relationship, ResolvedFieldAddress, SchemaCatalog,
};
pub use registry::{
    parse_datetime, LikePattern, OperatorEntry, OperatorRegistry, SqlShape, TypeMismatch,
};
pub use types::Value;
