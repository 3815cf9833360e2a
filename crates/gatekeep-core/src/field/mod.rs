//! Field addresses and the schema catalog they resolve against
//!
//! Addresses come in two forms:
//! - colon form `dataset:collection:field` (the dataset prefix is optional)
//! - dotted form `root.column.nested`, where the first segment is a root only
//!   if the catalog or the caller knows it as one

mod address;
mod catalog;

pub use address::{FieldResolver, ResolvedFieldAddress};
pub use catalog::{singular, JoinOn, PartitionSpec, Relationship, SchemaCatalog};
