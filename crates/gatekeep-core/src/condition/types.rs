//! Condition tree types

use super::operator::{GroupOperator, Operator};
use crate::error::{CoreError, Result};
use crate::types::Value;
use serde::{Deserialize, Serialize};

/// A node of the condition tree: a leaf predicate or a boolean group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionNode {
    /// Single field/operator/value predicate
    Leaf(ConditionLeaf),
    /// AND/OR combinator over child nodes
    Group(ConditionGroup),
}

/// A single predicate, e.g. `customer:email starts_with "customer-1"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionLeaf {
    /// Resolvable path to the value (`dataset:collection:field` or dotted)
    pub field_address: String,
    /// Comparison operator
    pub operator: Operator,
    /// Comparison operand; absent only for `exists` / `not_exists`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Logical grouping of child conditions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionGroup {
    /// How the children are combined
    pub logical_operator: GroupOperator,
    /// Children, in evaluation and rendering order
    pub conditions: Vec<ConditionNode>,
}

impl ConditionLeaf {
    /// Create a validated leaf.
    ///
    /// A `list_contains` leaf given a list value is recorded as
    /// `list_contains_any`; this is the only place the value shape picks the mode.
    pub fn new(
        field_address: impl Into<String>,
        operator: Operator,
        value: Option<Value>,
    ) -> Result<Self> {
        let leaf = Self {
            field_address: field_address.into(),
            operator,
            value,
        }
        .normalized();
        leaf.validate()?;
        Ok(leaf)
    }

    /// Leaf checking that the field is present and non-null
    pub fn exists(field_address: impl Into<String>) -> Result<Self> {
        Self::new(field_address, Operator::Exists, None)
    }

    /// Leaf checking that the field is absent or null
    pub fn not_exists(field_address: impl Into<String>) -> Result<Self> {
        Self::new(field_address, Operator::NotExists, None)
    }

    /// The operand, if the operator takes one
    pub fn expected(&self) -> Option<&Value> {
        if self.operator.requires_value() {
            self.value.as_ref()
        } else {
            None
        }
    }

    /// Human-readable form used in traces and log lines
    pub fn describe(&self) -> String {
        match self.expected() {
            Some(value) => format!("{} {} {}", self.field_address, self.operator, value),
            None => format!("{} {}", self.field_address, self.operator),
        }
    }

    fn normalized(mut self) -> Self {
        self.normalize();
        self
    }

    fn normalize(&mut self) {
        if self.operator == Operator::ListContains
            && matches!(self.value, Some(Value::Array(_)))
        {
            log::debug!(
                "list_contains on '{}' given a list, recording as list_contains_any",
                self.field_address
            );
            self.operator = Operator::ListContainsAny;
        }
    }

    /// Check the leaf invariants without modifying it
    pub fn validate(&self) -> Result<()> {
        if self.field_address.trim().is_empty() {
            return Err(CoreError::invalid("field_address must not be empty"));
        }

        if !self.operator.requires_value() {
            return Ok(());
        }

        let value = match &self.value {
            None | Some(Value::Null) => {
                return Err(CoreError::invalid(format!(
                    "operator '{}' on '{}' requires a value",
                    self.operator, self.field_address
                )))
            }
            Some(v) => v,
        };

        let fail = |reason: &str| -> Result<()> {
            Err(CoreError::invalid(format!(
                "operator '{}' on '{}' {}, got {}",
                self.operator,
                self.field_address,
                reason,
                value.type_name()
            )))
        };

        match self.operator {
            Operator::Eq | Operator::Neq => match value {
                Value::Array(items) => {
                    check_list(items).or_else(|_| fail("requires a non-empty list of scalars"))
                }
                Value::Object(_) => fail("requires a scalar or list"),
                _ => Ok(()),
            },
            Operator::Lt | Operator::Lte | Operator::Gt | Operator::Gte => match value {
                Value::Number(_) | Value::String(_) => Ok(()),
                _ => fail("requires a number or datetime string"),
            },
            Operator::Contains | Operator::NotContains => match value {
                Value::String(_) | Value::Number(_) | Value::Bool(_) => Ok(()),
                _ => fail("requires a scalar"),
            },
            Operator::StartsWith | Operator::EndsWith => match value {
                Value::String(_) => Ok(()),
                _ => fail("requires a string"),
            },
            Operator::InList | Operator::NotInList | Operator::ListContainsAny => match value {
                Value::Array(items) => {
                    check_list(items).or_else(|_| fail("requires a non-empty list of scalars"))
                }
                _ => fail("requires a list"),
            },
            Operator::ListContains => match value {
                Value::Array(_) => fail("takes a scalar; use list_contains_any for lists"),
                Value::Object(_) => fail("requires a scalar"),
                _ => Ok(()),
            },
            Operator::Exists | Operator::NotExists => Ok(()),
        }
    }
}

fn check_list(items: &[Value]) -> Result<()> {
    if items.is_empty() || items.iter().any(|v| !v.is_scalar() || v.is_null()) {
        return Err(CoreError::invalid("list operand"));
    }
    Ok(())
}

impl ConditionGroup {
    /// Create a validated group. Empty groups are rejected.
    pub fn new(logical_operator: GroupOperator, conditions: Vec<ConditionNode>) -> Result<Self> {
        let group = Self {
            logical_operator,
            conditions,
        };
        group.validate()?;
        Ok(group)
    }

    /// AND group
    pub fn and(conditions: Vec<ConditionNode>) -> Result<Self> {
        Self::new(GroupOperator::And, conditions)
    }

    /// OR group
    pub fn or(conditions: Vec<ConditionNode>) -> Result<Self> {
        Self::new(GroupOperator::Or, conditions)
    }

    /// Check arity of this group and every descendant
    pub fn validate(&self) -> Result<()> {
        if self.conditions.is_empty() {
            return Err(CoreError::invalid(format!(
                "'{}' group must contain at least one condition",
                self.logical_operator.as_str()
            )));
        }
        self.conditions.iter().try_for_each(ConditionNode::validate)
    }
}

impl ConditionNode {
    /// Create a validated leaf node with an operand
    pub fn leaf(
        field_address: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Result<Self> {
        ConditionLeaf::new(field_address, operator, Some(value.into())).map(ConditionNode::Leaf)
    }

    /// Create a validated `exists` leaf node
    pub fn exists(field_address: impl Into<String>) -> Result<Self> {
        ConditionLeaf::exists(field_address).map(ConditionNode::Leaf)
    }

    /// Create a validated `not_exists` leaf node
    pub fn not_exists(field_address: impl Into<String>) -> Result<Self> {
        ConditionLeaf::not_exists(field_address).map(ConditionNode::Leaf)
    }

    /// Create a validated AND node
    pub fn and(conditions: Vec<ConditionNode>) -> Result<Self> {
        ConditionGroup::and(conditions).map(ConditionNode::Group)
    }

    /// Create a validated OR node
    pub fn or(conditions: Vec<ConditionNode>) -> Result<Self> {
        ConditionGroup::or(conditions).map(ConditionNode::Group)
    }

    /// Parse a tree from JSON, normalize `list_contains` leaves and validate
    pub fn from_json(json: &str) -> Result<Self> {
        let mut node: ConditionNode = serde_json::from_str(json)
            .map_err(|e| CoreError::invalid(format!("malformed condition tree: {}", e)))?;
        node.normalize();
        node.validate()?;
        Ok(node)
    }

    /// Check the invariants of the whole tree
    pub fn validate(&self) -> Result<()> {
        match self {
            ConditionNode::Leaf(leaf) => leaf.validate(),
            ConditionNode::Group(group) => group.validate(),
        }
    }

    fn normalize(&mut self) {
        match self {
            ConditionNode::Leaf(leaf) => leaf.normalize(),
            ConditionNode::Group(group) => group.conditions.iter_mut().for_each(Self::normalize),
        }
    }

    /// All leaves of the tree, depth-first in authored order
    pub fn leaves(&self) -> Vec<&ConditionLeaf> {
        let mut result = Vec::new();
        self.collect_leaves(&mut result);
        result
    }

    fn collect_leaves<'a>(&'a self, result: &mut Vec<&'a ConditionLeaf>) {
        match self {
            ConditionNode::Leaf(leaf) => result.push(leaf),
            ConditionNode::Group(group) => {
                for child in &group.conditions {
                    child.collect_leaves(result);
                }
            }
        }
    }

    /// Number of nested levels; a single leaf has depth 1
    pub fn depth(&self) -> usize {
        match self {
            ConditionNode::Leaf(_) => 1,
            ConditionNode::Group(group) => {
                1 + group.conditions.iter().map(Self::depth).max().unwrap_or(0)
            }
        }
    }
}

impl From<ConditionLeaf> for ConditionNode {
    fn from(leaf: ConditionLeaf) -> Self {
        ConditionNode::Leaf(leaf)
    }
}

impl From<ConditionGroup> for ConditionNode {
    fn from(group: ConditionGroup) -> Self {
        ConditionNode::Group(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_requires_value() {
        let err = ConditionLeaf::new("customer:email", Operator::Eq, None).unwrap_err();
        assert!(matches!(err, CoreError::InvalidCondition(_)));

        let err = ConditionLeaf::new("customer:email", Operator::Eq, Some(Value::Null)).unwrap_err();
        assert!(err.to_string().contains("requires a value"));
    }

    #[test]
    fn test_exists_needs_no_value() {
        let leaf = ConditionLeaf::exists("customer:name").unwrap();
        assert_eq!(leaf.operator, Operator::Exists);
        assert!(leaf.expected().is_none());
    }

    #[test]
    fn test_blank_field_address_rejected() {
        assert!(ConditionLeaf::exists("   ").is_err());
        assert!(ConditionLeaf::new("", Operator::Eq, Some("x".into())).is_err());
    }

    #[test]
    fn test_empty_group_rejected_for_both_operators() {
        assert!(matches!(
            ConditionGroup::and(vec![]),
            Err(CoreError::InvalidCondition(_))
        ));
        assert!(matches!(
            ConditionGroup::or(vec![]),
            Err(CoreError::InvalidCondition(_))
        ));
    }

    #[test]
    fn test_list_operators_need_lists() {
        assert!(ConditionLeaf::new("status", Operator::InList, Some("a".into())).is_err());
        assert!(ConditionLeaf::new("status", Operator::InList, Some(Value::Array(vec![]))).is_err());
        assert!(ConditionLeaf::new("status", Operator::NotInList, Some(vec!["a", "b"].into())).is_ok());
    }

    #[test]
    fn test_list_contains_with_list_becomes_any() {
        let leaf = ConditionLeaf::new("tags", Operator::ListContains, Some(vec!["a"].into())).unwrap();
        assert_eq!(leaf.operator, Operator::ListContainsAny);

        let leaf = ConditionLeaf::new("tags", Operator::ListContains, Some("a".into())).unwrap();
        assert_eq!(leaf.operator, Operator::ListContains);
    }

    #[test]
    fn test_raw_list_contains_with_list_fails_validation() {
        let leaf = ConditionLeaf {
            field_address: "tags".to_string(),
            operator: Operator::ListContains,
            value: Some(vec!["a", "b"].into()),
        };
        assert!(leaf.validate().is_err());
    }

    #[test]
    fn test_ordering_rejects_bool() {
        assert!(ConditionLeaf::new("age", Operator::Gt, Some(true.into())).is_err());
        assert!(ConditionLeaf::new("created_at", Operator::Gte, Some("2024-01-01".into())).is_ok());
    }

    #[test]
    fn test_nested_group_validation() {
        let raw = ConditionNode::Group(ConditionGroup {
            logical_operator: GroupOperator::And,
            conditions: vec![ConditionNode::Group(ConditionGroup {
                logical_operator: GroupOperator::Or,
                conditions: vec![],
            })],
        });
        assert!(raw.validate().is_err());
    }

    #[test]
    fn test_from_json_builds_nested_tree() {
        let json = r#"{
            "logical_operator": "and",
            "conditions": [
                {"field_address": "customer:name", "operator": "exists"},
                {"field_address": "customer:email", "operator": "starts_with", "value": "customer-1"},
                {"logical_operator": "or", "conditions": [
                    {"field_address": "customer:id", "operator": "gt", "value": 0},
                    {"field_address": "address:city", "operator": "starts_with", "value": "Example"}
                ]}
            ]
        }"#;
        let node = ConditionNode::from_json(json).unwrap();
        assert_eq!(node.leaves().len(), 4);
        assert_eq!(node.depth(), 3);
    }

    #[test]
    fn test_from_json_normalizes_list_contains() {
        let json = r#"{"field_address": "tags", "operator": "list_contains", "value": ["a", "b"]}"#;
        match ConditionNode::from_json(json).unwrap() {
            ConditionNode::Leaf(leaf) => assert_eq!(leaf.operator, Operator::ListContainsAny),
            other => panic!("Expected leaf, got {:?}", other),
        }
    }

    #[test]
    fn test_from_json_rejects_empty_group() {
        let json = r#"{"logical_operator": "or", "conditions": []}"#;
        assert!(matches!(
            ConditionNode::from_json(json),
            Err(CoreError::InvalidCondition(_))
        ));
    }

    #[test]
    fn test_describe() {
        let leaf = ConditionLeaf::new("customer:id", Operator::Gt, Some(0.into())).unwrap();
        assert_eq!(leaf.describe(), "customer:id gt 0");
        assert_eq!(ConditionLeaf::exists("customer:name").unwrap().describe(), "customer:name exists");
    }
}
