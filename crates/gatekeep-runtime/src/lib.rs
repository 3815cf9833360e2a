//! gatekeep Runtime - in-memory condition evaluation
//!
//! Evaluates condition trees against record data supplied through a
//! [`RecordAccessor`]. Evaluation is pure: no I/O, and the same tree and
//! record snapshot always produce the same verdict.

pub mod context;
pub mod engine;
pub mod error;
pub mod result;

// Re-export main types
pub use context::{FlatRow, RecordAccessor, RecordGraph};
pub use engine::ConditionEvaluator;
pub use error::{Result, RuntimeError};
pub use result::ConditionTrace;
