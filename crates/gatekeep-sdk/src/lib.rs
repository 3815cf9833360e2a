//! gatekeep SDK
//!
//! Boundary layer over the condition core: assembles persisted
//! conditional-dependency rows into a tree, gates on it in memory and
//! compiles it to SQL, all from one YAML-loadable configuration.

pub mod config;
pub mod dependency;
pub mod error;
pub mod gate;

// Re-export main types
pub use config::GateConfig;
pub use dependency::{build_condition_tree, ConditionType, ConditionalDependencyRow, MAX_TREE_DEPTH};
pub use error::{Result, SdkError};
pub use gate::{DependencyGate, GateDecision};

// Re-export commonly used types from dependencies
pub use gatekeep_core::{ConditionNode, GroupOperator, Operator, SchemaCatalog, Value};
pub use gatekeep_runtime::{ConditionTrace, FlatRow, RecordAccessor, RecordGraph};
pub use gatekeep_sql::{CompiledQuery, Dialect, SelectOptions, UpdateStatement};
