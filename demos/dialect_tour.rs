//! Dialect tour example
//!
//! Compiles one condition tree for every supported dialect and prints the
//! SQL and bindings side by side, including unsupported-operator reports.

use anyhow::Result;
use gatekeep_sdk::{ConditionNode, Dialect, DependencyGate, GateConfig, Operator, SchemaCatalog, SelectOptions};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gatekeep_sql=info".into()),
        )
        .init();

    println!("=== Dialect Tour ===\n");

    let tree = ConditionNode::and(vec![
        ConditionNode::or(vec![
            ConditionNode::leaf("status", Operator::Eq, "approved")?,
            ConditionNode::leaf("status", Operator::Eq, "complete")?,
        ])?,
        ConditionNode::leaf("manual_task.assigned_users", Operator::ListContains, "user_42")?,
        ConditionNode::leaf("details.reviewer", Operator::Contains, "50%")?,
    ])?;
    let catalog = SchemaCatalog::new().with_roots(["manual_task_instance", "manual_task"]);
    let options = SelectOptions::new().with_limit(20).with_offset(40);

    for dialect in Dialect::ALL {
        let gate = DependencyGate::new(
            GateConfig::new()
                .with_dialect(dialect)
                .with_catalog(catalog.clone())
                .with_default_root("manual_task_instance"),
        );
        println!("--- {} ---", dialect);
        match gate.select_query(&tree, None, &options) {
            Ok(query) => {
                println!("{}", query.sql_text);
                for name in query.parameter_order(dialect) {
                    println!("  {} = {}", name, query.parameters[name]);
                }
            }
            Err(e) => println!("(not compiled: {})", e),
        }
        println!();
    }

    Ok(())
}
