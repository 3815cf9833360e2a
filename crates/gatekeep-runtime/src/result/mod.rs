//! Evaluation results and traces

mod trace;

pub use trace::ConditionTrace;
