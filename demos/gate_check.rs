//! Gate check example
//!
//! This example demonstrates:
//! - Loading a gate configuration from YAML
//! - Assembling persisted dependency rows into a condition tree
//! - Checking the gate against two records, with the evaluation trace
//! - Compiling the same tree into a SELECT and a COUNT

use anyhow::Result;
use gatekeep_sdk::{
    build_condition_tree, ConditionalDependencyRow, DependencyGate, RecordGraph, SelectOptions,
};
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const CONFIG: &str = r#"
dialect: postgres
default_root: customer
catalog:
  roots: [customer, address]
"#;

fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gatekeep_sdk=info,gatekeep_runtime=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;
    Ok(())
}

fn main() -> Result<()> {
    init_tracing()?;
    println!("=== Gate Check Example ===\n");

    let gate = DependencyGate::from_yaml(CONFIG)?;

    // Rows as the manual-task subsystem stores them
    let rows: Vec<ConditionalDependencyRow> = serde_json::from_value(json!([
        {"id": "1", "condition_type": "group", "logical_operator": "and"},
        {"id": "2", "parent_id": "1", "condition_type": "leaf",
         "field_address": "customer:name", "operator": "exists", "sort_order": 0},
        {"id": "3", "parent_id": "1", "condition_type": "leaf",
         "field_address": "customer:email", "operator": "starts_with",
         "value": "customer-1", "sort_order": 1},
        {"id": "4", "parent_id": "1", "condition_type": "group",
         "logical_operator": "or", "sort_order": 2},
        {"id": "5", "parent_id": "4", "condition_type": "leaf",
         "field_address": "customer:id", "operator": "gt", "value": 0},
        {"id": "6", "parent_id": "4", "condition_type": "leaf",
         "field_address": "address:city", "operator": "starts_with",
         "value": "Example", "sort_order": 1}
    ]))?;
    let tree = build_condition_tree(&rows)?;
    println!("Condition tree:\n{}\n", serde_json::to_string_pretty(&tree)?);

    let records = [
        json!({"customer": {"email": "customer-1@example.com", "id": 5, "name": "Jane"}}),
        json!({"customer": {"email": "nonexistent@example.com", "id": 5, "name": "Jane"}}),
    ];
    for record in records {
        let graph = RecordGraph::from_json(record.clone())?;
        let decision = gate.check_rows(&rows, &graph);
        let (_, trace) = gate.evaluate_with_trace(&tree, &graph)?;
        println!("Record: {}", record);
        println!("  Decision: {:?}", decision);
        println!("  Leaves evaluated: {}\n", trace.evaluated_leaves());
    }

    let query = gate.select_query(&tree, None, &SelectOptions::new().with_limit(100))?;
    println!("SELECT:\n  {}", query.sql_text);
    println!("  Parameters: {}", serde_json::to_string(&query.parameters)?);

    let count = gate.count_query(&tree, None)?;
    println!("\nCOUNT:\n  {}", count.sql_text);

    Ok(())
}
