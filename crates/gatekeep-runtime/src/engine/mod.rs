//! Evaluation engine

mod evaluator;

pub use evaluator::ConditionEvaluator;
