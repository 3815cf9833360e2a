//! In-memory condition evaluator
//!
//! Depth-first, left-to-right evaluation of a condition tree against a
//! [`RecordAccessor`]. `and` stops at the first false child, `or` at the
//! first true one; children after that point are never resolved or fetched.

use crate::context::RecordAccessor;
use crate::error::Result;
use crate::result::ConditionTrace;
use gatekeep_core::{
    ConditionGroup, ConditionLeaf, ConditionNode, CoreError, FieldResolver, GroupOperator,
    OperatorRegistry, SchemaCatalog,
};
use std::borrow::Cow;

/// Evaluates condition trees against record data
#[derive(Debug, Clone)]
pub struct ConditionEvaluator {
    catalog: SchemaCatalog,
    registry: Cow<'static, OperatorRegistry>,
    default_root: Option<String>,
}

impl Default for ConditionEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

struct Evaluated {
    result: bool,
    trace: Option<ConditionTrace>,
}

impl ConditionEvaluator {
    /// Evaluator using the global operator registry and an empty catalog
    pub fn new() -> Self {
        Self {
            catalog: SchemaCatalog::default(),
            registry: Cow::Borrowed(OperatorRegistry::global()),
            default_root: None,
        }
    }

    pub fn with_catalog(mut self, catalog: SchemaCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Use a custom registry instead of the global one
    pub fn with_registry(mut self, registry: OperatorRegistry) -> Self {
        self.registry = Cow::Owned(registry);
        self
    }

    /// Root for addresses that do not name one
    pub fn with_default_root(mut self, root: impl Into<String>) -> Self {
        self.default_root = Some(root.into());
        self
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    /// Evaluate a condition to a verdict
    pub fn evaluate<A>(&self, condition: &ConditionNode, accessor: &A) -> Result<bool>
    where
        A: RecordAccessor + ?Sized,
    {
        let resolver = self.resolver(accessor);
        Ok(self.eval_node(condition, accessor, &resolver, false)?.result)
    }

    /// Evaluate and return the trace of every evaluated node
    pub fn evaluate_with_trace<A>(
        &self,
        condition: &ConditionNode,
        accessor: &A,
    ) -> Result<(bool, ConditionTrace)>
    where
        A: RecordAccessor + ?Sized,
    {
        let resolver = self.resolver(accessor);
        let evaluated = self.eval_node(condition, accessor, &resolver, true)?;
        let trace = evaluated
            .trace
            .unwrap_or_else(|| ConditionTrace::group("and", Vec::new(), evaluated.result));
        Ok((evaluated.result, trace))
    }

    fn resolver<'a, A>(&'a self, accessor: &A) -> FieldResolver<'a>
    where
        A: RecordAccessor + ?Sized,
    {
        let resolver = FieldResolver::new(&self.catalog).with_known_roots(accessor.roots());
        match accessor.primary_root() {
            Some(primary) => resolver.with_primary_root(primary),
            None => resolver,
        }
    }

    fn eval_node<A>(
        &self,
        node: &ConditionNode,
        accessor: &A,
        resolver: &FieldResolver<'_>,
        trace: bool,
    ) -> Result<Evaluated>
    where
        A: RecordAccessor + ?Sized,
    {
        match node {
            ConditionNode::Leaf(leaf) => self.eval_leaf(leaf, accessor, resolver, trace),
            ConditionNode::Group(group) => self.eval_group(group, accessor, resolver, trace),
        }
    }

    fn eval_group<A>(
        &self,
        group: &ConditionGroup,
        accessor: &A,
        resolver: &FieldResolver<'_>,
        trace: bool,
    ) -> Result<Evaluated>
    where
        A: RecordAccessor + ?Sized,
    {
        if group.conditions.is_empty() {
            return Err(CoreError::InvalidCondition(format!(
                "{} group has no conditions",
                group.logical_operator.as_str()
            ))
            .into());
        }

        // `and` stops on false, `or` stops on true
        let stop_on = group.logical_operator == GroupOperator::Or;
        let mut result = !stop_on;
        let mut nested = Vec::new();

        for (index, child) in group.conditions.iter().enumerate() {
            let evaluated = self.eval_node(child, accessor, resolver, trace)?;
            nested.extend(evaluated.trace);
            if evaluated.result == stop_on {
                result = stop_on;
                let skipped = group.conditions.len() - index - 1;
                if skipped > 0 {
                    tracing::debug!(
                        "{} group short-circuited, {} condition(s) skipped",
                        group.logical_operator.as_str(),
                        skipped
                    );
                }
                break;
            }
        }

        Ok(Evaluated {
            result,
            trace: trace
                .then(|| ConditionTrace::group(group.logical_operator.as_str(), nested, result)),
        })
    }

    fn eval_leaf<A>(
        &self,
        leaf: &ConditionLeaf,
        accessor: &A,
        resolver: &FieldResolver<'_>,
        trace: bool,
    ) -> Result<Evaluated>
    where
        A: RecordAccessor + ?Sized,
    {
        leaf.validate()?;
        let entry = self.registry.get(leaf.operator)?;
        let resolved = resolver.resolve(&leaf.field_address, self.default_root.as_deref())?;
        let actual = accessor.get(&resolved)?;
        let expected = leaf.expected();

        let (result, note) = match entry.compare(actual.as_ref(), expected) {
            Ok(result) => (result, None),
            Err(mismatch) => {
                tracing::warn!("{}: {}, treating as false", leaf.describe(), mismatch);
                (false, Some(mismatch.to_string()))
            }
        };

        tracing::debug!("{} -> {}", leaf.describe(), result);

        let trace = trace.then(|| {
            let leaf_trace = ConditionTrace::leaf(
                leaf.describe(),
                actual,
                leaf.operator.as_str(),
                expected.cloned(),
                result,
            );
            match note {
                Some(note) => leaf_trace.with_note(note),
                None => leaf_trace,
            }
        });

        Ok(Evaluated { result, trace })
    }
}
