//! Unit tests for the in-memory evaluator
//!
//! Covers the dependency-tree scenarios and short-circuit guarantees

use gatekeep_core::{ConditionNode, Operator, ResolvedFieldAddress, SchemaCatalog, Value};
use gatekeep_runtime::*;
use serde_json::json;
use std::cell::RefCell;

fn dependency_tree() -> ConditionNode {
    ConditionNode::and(vec![
        ConditionNode::exists("customer:name").unwrap(),
        ConditionNode::leaf("customer:email", Operator::StartsWith, "customer-1").unwrap(),
        ConditionNode::or(vec![
            ConditionNode::leaf("customer:id", Operator::Gt, 0).unwrap(),
            ConditionNode::leaf("address:city", Operator::StartsWith, "Example").unwrap(),
        ])
        .unwrap(),
    ])
    .unwrap()
}

/// Accessor that records every lookup and fails on one address
struct ProbeAccessor {
    inner: RecordGraph,
    poisoned: &'static str,
    seen: RefCell<Vec<String>>,
}

impl ProbeAccessor {
    fn new(inner: RecordGraph, poisoned: &'static str) -> Self {
        Self {
            inner,
            poisoned,
            seen: RefCell::new(Vec::new()),
        }
    }
}

impl RecordAccessor for ProbeAccessor {
    fn get(&self, field: &ResolvedFieldAddress) -> Result<Option<Value>> {
        self.seen.borrow_mut().push(field.address.clone());
        if field.address == self.poisoned {
            return Err(RuntimeError::Accessor {
                address: field.address.clone(),
                reason: "must not be evaluated".to_string(),
            });
        }
        self.inner.get(field)
    }

    fn roots(&self) -> Vec<String> {
        self.inner.roots()
    }
}

// =============================================================================
// Dependency Tree Scenarios
// =============================================================================

#[test]
fn test_dependency_tree_satisfied() -> anyhow::Result<()> {
    let record = RecordGraph::from_json(json!({
        "customer": {"email": "customer-1@example.com", "id": 5, "name": "Jane"}
    }))?;
    let evaluator = ConditionEvaluator::new();
    assert!(evaluator.evaluate(&dependency_tree(), &record)?);
    Ok(())
}

#[test]
fn test_dependency_tree_fails_on_email() -> anyhow::Result<()> {
    let record = RecordGraph::from_json(json!({
        "customer": {"email": "nonexistent@example.com", "id": 5, "name": "Jane"},
        "address": {"city": "Exampleville"}
    }))?;
    let evaluator = ConditionEvaluator::new();
    assert!(!evaluator.evaluate(&dependency_tree(), &record)?);

    let (result, trace) = evaluator.evaluate_with_trace(&dependency_tree(), &record)?;
    assert!(!result);
    // name, email; the nested OR is never reached
    assert_eq!(trace.evaluated_leaves(), 2);
    Ok(())
}

#[test]
fn test_or_branch_uses_related_root() -> anyhow::Result<()> {
    let record = RecordGraph::from_json(json!({
        "customer": {"email": "customer-1@example.com", "id": 0, "name": "Jane"},
        "address": {"city": "Exampleville"}
    }))?;
    let evaluator = ConditionEvaluator::new();
    assert!(evaluator.evaluate(&dependency_tree(), &record)?);
    Ok(())
}

// =============================================================================
// Short-circuit Tests
// =============================================================================

#[test]
fn test_and_short_circuit_skips_failing_accessor() -> anyhow::Result<()> {
    let graph = RecordGraph::new().with_root("customer", Value::from(json!({"id": 1})));
    let accessor = ProbeAccessor::new(graph, "customer:boom");
    let tree = ConditionNode::and(vec![
        ConditionNode::leaf("customer:id", Operator::Eq, 2)?,
        ConditionNode::leaf("customer:boom", Operator::Eq, 1)?,
    ])?;

    let evaluator = ConditionEvaluator::new();
    assert!(!evaluator.evaluate(&tree, &accessor)?);
    assert_eq!(*accessor.seen.borrow(), vec!["customer:id".to_string()]);
    Ok(())
}

#[test]
fn test_or_short_circuit_skips_failing_accessor() -> anyhow::Result<()> {
    let graph = RecordGraph::new().with_root("customer", Value::from(json!({"id": 1})));
    let accessor = ProbeAccessor::new(graph, "customer:boom");
    let tree = ConditionNode::or(vec![
        ConditionNode::leaf("customer:id", Operator::Eq, 1)?,
        ConditionNode::leaf("customer:boom", Operator::Eq, 1)?,
    ])?;

    let evaluator = ConditionEvaluator::new();
    assert!(evaluator.evaluate(&tree, &accessor)?);
    Ok(())
}

#[test]
fn test_accessor_error_propagates_when_reached() {
    let graph = RecordGraph::new().with_root("customer", Value::from(json!({"id": 1})));
    let accessor = ProbeAccessor::new(graph, "customer:boom");
    let tree = ConditionNode::and(vec![
        ConditionNode::leaf("customer:id", Operator::Eq, 1).unwrap(),
        ConditionNode::leaf("customer:boom", Operator::Eq, 1).unwrap(),
    ])
    .unwrap();

    let err = ConditionEvaluator::new()
        .evaluate(&tree, &accessor)
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Accessor { .. }));
}

// =============================================================================
// Determinism and Accessor Tests
// =============================================================================

#[test]
fn test_evaluation_is_deterministic() -> anyhow::Result<()> {
    let record = RecordGraph::from_json(json!({
        "customer": {"email": "customer-1@example.com", "id": 5, "name": "Jane"}
    }))?;
    let evaluator = ConditionEvaluator::new();
    let first = evaluator.evaluate_with_trace(&dependency_tree(), &record)?;
    let second = evaluator.evaluate_with_trace(&dependency_tree(), &record)?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_flat_row_with_field_mapping() -> anyhow::Result<()> {
    let catalog = SchemaCatalog::new().with_field_mapping("user_email", "email_address");
    let evaluator = ConditionEvaluator::new().with_catalog(catalog);
    let row = FlatRow::new("fidesuser").with_column("email_address", "user1@example.com");
    let cond = ConditionNode::leaf("user_email", Operator::Eq, "user1@example.com")?;
    assert!(evaluator.evaluate(&cond, &row)?);
    Ok(())
}

#[test]
fn test_in_list_and_eq_list_agree() -> anyhow::Result<()> {
    let evaluator = ConditionEvaluator::new();
    let eq_list = ConditionNode::leaf("status", Operator::Eq, vec!["approved", "complete"])?;
    let in_list = ConditionNode::leaf("status", Operator::InList, vec!["approved", "complete"])?;
    let or_eq = ConditionNode::or(vec![
        ConditionNode::leaf("status", Operator::Eq, "approved")?,
        ConditionNode::leaf("status", Operator::Eq, "complete")?,
    ])?;
    for status in ["approved", "complete", "pending"] {
        let row = FlatRow::new("manual_task_instance").with_column("status", status);
        let expected = evaluator.evaluate(&or_eq, &row)?;
        assert_eq!(evaluator.evaluate(&eq_list, &row)?, expected, "{}", status);
        assert_eq!(evaluator.evaluate(&in_list, &row)?, expected, "{}", status);
    }
    Ok(())
}
