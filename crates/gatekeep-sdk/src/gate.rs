//! DependencyGate - evaluation and query compilation behind one configuration

use crate::config::GateConfig;
use crate::dependency::{build_condition_tree, ConditionalDependencyRow};
use crate::error::{Result, SdkError};
use gatekeep_core::ConditionNode;
use gatekeep_runtime::{ConditionEvaluator, ConditionTrace, RecordAccessor};
use gatekeep_sql::{CompiledQuery, SelectOptions, SqlTranslator};
use serde::{Deserialize, Serialize};

/// Outcome of a gate check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GateDecision {
    Satisfied,
    NotSatisfied,
    /// The check itself failed; the gate stays closed
    Failed { reason: String },
}

impl GateDecision {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, GateDecision::Satisfied)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, GateDecision::Failed { .. })
    }
}

/// Gate over conditional dependencies
///
/// # Example
///
/// ```rust,ignore
/// use gatekeep_sdk::{DependencyGate, GateConfig};
///
/// let gate = DependencyGate::new(GateConfig::from_file("gate.yaml")?);
/// let decision = gate.check(&tree, &record);
/// let query = gate.select_query(&tree, None, &SelectOptions::new())?;
/// ```
#[derive(Debug, Clone)]
pub struct DependencyGate {
    config: GateConfig,
    evaluator: ConditionEvaluator,
    translator: SqlTranslator,
}

impl DependencyGate {
    /// Create a gate from a configuration
    pub fn new(config: GateConfig) -> Self {
        let mut evaluator = ConditionEvaluator::new().with_catalog(config.catalog.clone());
        if let Some(root) = &config.default_root {
            evaluator = evaluator.with_default_root(root.clone());
        }
        let translator = SqlTranslator::new(config.dialect)
            .with_catalog(config.catalog.clone())
            .with_options(config.options.clone());
        Self {
            config,
            evaluator,
            translator,
        }
    }

    /// Create a gate from a YAML configuration document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(Self::new(GateConfig::from_yaml_str(yaml)?))
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn translator(&self) -> &SqlTranslator {
        &self.translator
    }

    /// Evaluate a tree against a record; errors propagate
    pub fn evaluate<A>(&self, condition: &ConditionNode, accessor: &A) -> Result<bool>
    where
        A: RecordAccessor + ?Sized,
    {
        Ok(self.evaluator.evaluate(condition, accessor)?)
    }

    /// Evaluate and return the trace of the evaluated nodes
    pub fn evaluate_with_trace<A>(
        &self,
        condition: &ConditionNode,
        accessor: &A,
    ) -> Result<(bool, ConditionTrace)>
    where
        A: RecordAccessor + ?Sized,
    {
        Ok(self.evaluator.evaluate_with_trace(condition, accessor)?)
    }

    /// Gate check: failures close this gate and are logged, never propagated
    pub fn check<A>(&self, condition: &ConditionNode, accessor: &A) -> GateDecision
    where
        A: RecordAccessor + ?Sized,
    {
        match self.evaluate(condition, accessor) {
            Ok(true) => GateDecision::Satisfied,
            Ok(false) => GateDecision::NotSatisfied,
            Err(e) => {
                tracing::warn!("gate check failed: {}", e);
                GateDecision::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Gate check over persisted dependency rows
    ///
    /// No rows means no dependency, which is satisfied.
    pub fn check_rows<A>(&self, rows: &[ConditionalDependencyRow], accessor: &A) -> GateDecision
    where
        A: RecordAccessor + ?Sized,
    {
        if rows.is_empty() {
            return GateDecision::Satisfied;
        }
        match build_condition_tree(rows) {
            Ok(tree) => self.check(&tree, accessor),
            Err(e) => {
                tracing::warn!("dependency rows rejected: {}", e);
                GateDecision::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    fn root<'a>(&'a self, primary_root: Option<&'a str>) -> Result<&'a str> {
        primary_root
            .or(self.config.default_root.as_deref())
            .ok_or_else(|| {
                SdkError::ConfigError("no primary root given and no default_root set".to_string())
            })
    }

    /// SELECT for the rows matching `condition`
    pub fn select_query(
        &self,
        condition: &ConditionNode,
        primary_root: Option<&str>,
        options: &SelectOptions,
    ) -> Result<CompiledQuery> {
        let root = self.root(primary_root)?;
        Ok(self.translator.generate_select_query(condition, root, options)?)
    }

    /// One SELECT per partition of the root (a single query when unpartitioned)
    pub fn partitioned_select_queries(
        &self,
        condition: &ConditionNode,
        primary_root: Option<&str>,
        options: &SelectOptions,
    ) -> Result<Vec<CompiledQuery>> {
        let root = self.root(primary_root)?;
        Ok(self
            .translator
            .partitioned_select_queries(condition, root, options)?)
    }

    /// COUNT of the rows matching `condition`
    pub fn count_query(
        &self,
        condition: &ConditionNode,
        primary_root: Option<&str>,
    ) -> Result<CompiledQuery> {
        let root = self.root(primary_root)?;
        Ok(self.translator.generate_count_query(condition, root)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatekeep_core::Operator;
    use gatekeep_runtime::FlatRow;
    use serde_json::json;

    fn gate() -> DependencyGate {
        DependencyGate::new(GateConfig::new().with_default_root("customer"))
    }

    #[test]
    fn test_check_outcomes() {
        let tree = ConditionNode::leaf("status", Operator::Eq, "active").unwrap();
        let active = FlatRow::from_json("customer", json!({"status": "active"})).unwrap();
        let closed = FlatRow::from_json("customer", json!({"status": "closed"})).unwrap();
        assert_eq!(gate().check(&tree, &active), GateDecision::Satisfied);
        assert_eq!(gate().check(&tree, &closed), GateDecision::NotSatisfied);
    }

    #[test]
    fn test_check_failure_does_not_propagate() {
        let tree = ConditionNode::leaf("customer:", Operator::Eq, "active").unwrap();
        let row = FlatRow::new("customer");
        let decision = gate().check(&tree, &row);
        assert!(decision.is_failed());
        assert!(!decision.is_satisfied());
    }

    #[test]
    fn test_empty_rows_are_satisfied() {
        let row = FlatRow::new("customer");
        assert!(gate().check_rows(&[], &row).is_satisfied());
    }

    #[test]
    fn test_query_needs_a_root() {
        let tree = ConditionNode::exists("email").unwrap();
        let gate = DependencyGate::new(GateConfig::new());
        let err = gate.count_query(&tree, None).unwrap_err();
        assert!(matches!(err, SdkError::ConfigError(_)));
        assert!(gate.count_query(&tree, Some("customer")).is_ok());
    }

    #[test]
    fn test_decision_serialization() {
        let json = serde_json::to_value(GateDecision::Failed {
            reason: "boom".to_string(),
        })
        .unwrap();
        assert_eq!(json, json!({"status": "failed", "reason": "boom"}));
    }
}
