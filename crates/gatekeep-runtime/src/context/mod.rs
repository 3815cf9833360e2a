//! Record access for in-memory evaluation

mod accessor;
mod field_lookup;

pub use accessor::{FlatRow, RecordAccessor, RecordGraph};
