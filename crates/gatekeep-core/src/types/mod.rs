//! Type system for gatekeep
//!
//! Record data and condition operands share a single dynamic `Value` type.

pub mod value;

pub use value::Value;
