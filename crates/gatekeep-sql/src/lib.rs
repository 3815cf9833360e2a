//! gatekeep SQL - dialect-aware query generation
//!
//! Lowers condition trees into parameterized SQL:
//! - WHERE expressions, SELECT and COUNT queries with joins for related roots
//! - UPDATE / masking / DELETE statements located by a condition
//! - Per-partition replication of statements on partitioned collections
//!
//! Dialect differences live in a single policy table (see [`Dialect::policy`]).
//! Operand values never appear in generated text; they are returned as
//! named parameters alongside it.

pub mod config;
pub mod dialect;
pub mod error;
pub mod partition;
pub mod query;
mod render;
pub mod statement;
pub mod translator;

pub use config::{ParamNaming, TranslatorOptions};
pub use dialect::{Dialect, DialectPolicy};
pub use error::{Result, SqlError};
pub use partition::{parse_interval, partition_ranges, PartitionRange};
pub use query::{CompiledQuery, JoinSpec};
pub use statement::{StructuredUpdate, UpdateStatement};
pub use translator::{translate, SelectOptions, SqlTranslator};
