//! Persisted conditional-dependency rows → condition tree
//!
//! Rows reference their parent by id. Assembly rejects everything that is
//! not a single well-formed tree: duplicate ids, dangling parents, cycles,
//! rows unreachable from a root, and leaves or groups missing their fields.
//! The finished tree is built through the validating constructors.

use crate::error::{Result, SdkError};
use gatekeep_core::{ConditionGroup, ConditionLeaf, ConditionNode, GroupOperator, Operator, Value};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Deepest nesting accepted from persisted rows
pub const MAX_TREE_DEPTH: usize = 64;

/// Row kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionType {
    Leaf,
    Group,
}

/// One persisted conditional-dependency row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalDependencyRow {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub condition_type: ConditionType,
    #[serde(default)]
    pub field_address: Option<String>,
    /// Operator name as stored; parsed during assembly
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub logical_operator: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
}

impl ConditionalDependencyRow {
    /// Leaf row
    pub fn leaf(
        id: impl Into<String>,
        parent_id: Option<&str>,
        field_address: impl Into<String>,
        operator: Operator,
        value: Option<Value>,
    ) -> Self {
        Self {
            id: id.into(),
            parent_id: parent_id.map(str::to_string),
            condition_type: ConditionType::Leaf,
            field_address: Some(field_address.into()),
            operator: Some(operator.to_string()),
            value,
            logical_operator: None,
            sort_order: 0,
        }
    }

    /// Group row
    pub fn group(id: impl Into<String>, parent_id: Option<&str>, logical: GroupOperator) -> Self {
        Self {
            id: id.into(),
            parent_id: parent_id.map(str::to_string),
            condition_type: ConditionType::Group,
            field_address: None,
            operator: None,
            value: None,
            logical_operator: Some(logical.as_str().to_string()),
            sort_order: 0,
        }
    }

    pub fn with_sort_order(mut self, sort_order: i64) -> Self {
        self.sort_order = sort_order;
        self
    }
}

fn invalid(msg: impl Into<String>) -> SdkError {
    SdkError::InvalidDependencyRows(msg.into())
}

fn ordered<'r>(mut rows: Vec<&'r ConditionalDependencyRow>) -> Vec<&'r ConditionalDependencyRow> {
    rows.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.id.cmp(&b.id)));
    rows
}

struct Assembler<'r> {
    children: HashMap<&'r str, Vec<&'r ConditionalDependencyRow>>,
    visited: HashSet<&'r str>,
}

impl<'r> Assembler<'r> {
    fn build(&mut self, row: &'r ConditionalDependencyRow, depth: usize) -> Result<ConditionNode> {
        if depth > MAX_TREE_DEPTH {
            return Err(invalid(format!(
                "row '{}' is nested deeper than {}",
                row.id, MAX_TREE_DEPTH
            )));
        }
        if !self.visited.insert(row.id.as_str()) {
            return Err(invalid(format!("cycle through row '{}'", row.id)));
        }

        let children = self.children.get(row.id.as_str()).cloned().unwrap_or_default();
        match row.condition_type {
            ConditionType::Leaf => {
                if !children.is_empty() {
                    return Err(invalid(format!("leaf row '{}' has children", row.id)));
                }
                let address = row
                    .field_address
                    .as_deref()
                    .ok_or_else(|| invalid(format!("leaf row '{}' has no field_address", row.id)))?;
                let operator: Operator = row
                    .operator
                    .as_deref()
                    .ok_or_else(|| invalid(format!("leaf row '{}' has no operator", row.id)))?
                    .parse()?;
                Ok(ConditionLeaf::new(address, operator, row.value.clone())?.into())
            }
            ConditionType::Group => {
                let logical: GroupOperator = row
                    .logical_operator
                    .as_deref()
                    .ok_or_else(|| {
                        invalid(format!("group row '{}' has no logical_operator", row.id))
                    })?
                    .parse()?;
                let mut nodes = Vec::with_capacity(children.len());
                for child in children {
                    nodes.push(self.build(child, depth + 1)?);
                }
                Ok(ConditionGroup::new(logical, nodes)?.into())
            }
        }
    }
}

/// Assemble persisted rows into one condition tree.
///
/// Children are ordered by `sort_order`, then id. Several root rows are
/// combined under an implicit `and`.
pub fn build_condition_tree(rows: &[ConditionalDependencyRow]) -> Result<ConditionNode> {
    if rows.is_empty() {
        return Err(invalid("no rows"));
    }

    let mut ids: HashSet<&str> = HashSet::with_capacity(rows.len());
    for row in rows {
        if !ids.insert(row.id.as_str()) {
            return Err(invalid(format!("duplicate row id '{}'", row.id)));
        }
    }

    let mut children: HashMap<&str, Vec<&ConditionalDependencyRow>> = HashMap::new();
    let mut roots = Vec::new();
    for row in rows {
        match row.parent_id.as_deref() {
            None => roots.push(row),
            Some(parent) if !ids.contains(parent) => {
                return Err(invalid(format!(
                    "row '{}' references missing parent '{}'",
                    row.id, parent
                )))
            }
            Some(parent) => children.entry(parent).or_default().push(row),
        }
    }
    if roots.is_empty() {
        return Err(invalid("no root row; every row has a parent"));
    }

    let mut assembler = Assembler {
        children: children
            .into_iter()
            .map(|(parent, rows)| (parent, ordered(rows)))
            .collect(),
        visited: HashSet::with_capacity(rows.len()),
    };
    let mut nodes = Vec::new();
    for root in ordered(roots) {
        nodes.push(assembler.build(root, 0)?);
    }

    if assembler.visited.len() != rows.len() {
        let mut unreachable: Vec<&str> = rows
            .iter()
            .map(|r| r.id.as_str())
            .filter(|id| !assembler.visited.contains(id))
            .collect();
        unreachable.sort_unstable();
        return Err(invalid(format!(
            "rows not reachable from a root: {}",
            unreachable.join(", ")
        )));
    }

    tracing::debug!("assembled condition tree from {} rows", rows.len());
    if nodes.len() == 1 {
        return Ok(nodes.remove(0));
    }
    Ok(ConditionNode::and(nodes)?)
}
