//! Condition Model
//!
//! Conditions are immutable trees of leaf predicates combined by AND/OR groups.
//! The same tree is handed either to the in-memory evaluator (yes/no gate
//! decision against a loaded record) or to the SQL translator.
//!
//! # Shape
//!
//! ```json
//! {
//!   "logical_operator": "and",
//!   "conditions": [
//!     { "field_address": "customer:name", "operator": "exists" },
//!     { "field_address": "customer:email", "operator": "starts_with", "value": "customer-1" },
//!     {
//!       "logical_operator": "or",
//!       "conditions": [
//!         { "field_address": "customer:id", "operator": "gt", "value": 0 },
//!         { "field_address": "address:city", "operator": "starts_with", "value": "Example" }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! ## Supported Operators
//! - `eq`, `neq` (scalar, or a list for multi-value equality)
//! - `lt`, `lte`, `gt`, `gte` (numbers and ISO-8601 datetimes)
//! - `exists`, `not_exists` (no value)
//! - `contains`, `not_contains`, `starts_with`, `ends_with`
//! - `in_list`, `not_in_list` (list)
//! - `list_contains` (scalar member of an array field)
//! - `list_contains_any` (array field overlaps a list)
//!
//! Trees built through the constructors are validated. Trees assembled by hand
//! or deserialized with plain serde are not, so both evaluation and translation
//! re-check the invariants they depend on.

mod operator;
mod types;

pub use operator::{GroupOperator, Operator};
pub use types::{ConditionGroup, ConditionLeaf, ConditionNode};
