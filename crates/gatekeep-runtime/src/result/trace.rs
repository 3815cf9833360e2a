//! Evaluation tracing types
//!
//! A trace records only the nodes that were actually evaluated, so a
//! short-circuited group has fewer nested entries than it has children.

use gatekeep_core::Value;
use serde::{Deserialize, Serialize};

/// Trace of a single condition evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionTrace {
    /// The condition as a string (e.g., "customer:id gt 0")
    pub expression: String,

    /// Value found in the record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<Value>,

    /// The operator used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,

    /// The operand from the condition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<Value>,

    /// The evaluation result
    pub result: bool,

    /// Why a comparison resolved to false without matching (type mismatch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    /// Evaluated children of a group
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nested: Option<Vec<ConditionTrace>>,

    /// "and" or "or" for groups
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_type: Option<String>,
}

impl ConditionTrace {
    /// Create a leaf trace
    pub fn leaf(
        expression: String,
        actual: Option<Value>,
        operator: &str,
        expected: Option<Value>,
        result: bool,
    ) -> Self {
        Self {
            expression,
            actual,
            operator: Some(operator.to_string()),
            expected,
            result,
            note: None,
            nested: None,
            group_type: None,
        }
    }

    /// Create a logical group trace
    pub fn group(group_type: &str, nested: Vec<ConditionTrace>, result: bool) -> Self {
        Self {
            expression: format!("{}:[...]", group_type),
            actual: None,
            operator: None,
            expected: None,
            result,
            note: None,
            nested: Some(nested),
            group_type: Some(group_type.to_string()),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Number of leaves that were evaluated
    pub fn evaluated_leaves(&self) -> usize {
        match &self.nested {
            Some(children) => children.iter().map(Self::evaluated_leaves).sum(),
            None => 1,
        }
    }
}
