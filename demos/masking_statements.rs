//! Masking statements example
//!
//! This example demonstrates:
//! - UPDATE and DELETE generation located by a condition
//! - Nested-field masking per dialect, including whole-struct replacement
//! - Structured updates for NULL assignments on BigQuery
//! - Per-partition statement replication

use anyhow::Result;
use gatekeep_sdk::{ConditionNode, Dialect, DependencyGate, GateConfig, Operator, UpdateStatement, Value};
use serde_json::json;
use std::collections::BTreeMap;

const PARTITIONED: &str = r#"
dialect: bigquery
catalog:
  partitioning:
    customer:
      time_based:
        field: created_at
        start: "2024-01-01"
        end: "2024-01-31"
        interval: "10 DAY"
"#;

fn show(label: &str, statement: &UpdateStatement) {
    match statement {
        UpdateStatement::Text(query) => {
            println!("{}: {}", label, query.sql_text);
            println!("  params: {}", json!(query.parameters));
        }
        UpdateStatement::Structured(update) => {
            println!("{}: structured update of {}", label, update.table);
            println!("  values: {}", json!(update.values));
            println!("  where:  {}", update.where_sql);
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gatekeep_sql=debug".into()),
        )
        .init();

    println!("=== Masking Statements ===\n");

    let locator = ConditionNode::leaf("email", Operator::Eq, "customer-1@example.com")?;
    let mut masks = BTreeMap::new();
    masks.insert("name".to_string(), Value::Null);
    masks.insert("profile.phone".to_string(), Value::from("***"));

    let current_row: Value = json!({
        "name": "Jane",
        "profile": {"phone": "555-0100", "city": "Exampleville"}
    })
    .into();

    for dialect in [Dialect::Postgres, Dialect::MySql, Dialect::SqlServer, Dialect::BigQuery] {
        let gate = DependencyGate::new(GateConfig::new().with_dialect(dialect));
        let statement = gate.translator().generate_masking_stmt(
            "customer",
            &masks,
            &locator,
            Some(&current_row),
        )?;
        show(dialect.as_str(), &statement);
    }

    println!();
    let gate = DependencyGate::from_yaml(PARTITIONED)?;
    let mut values = BTreeMap::new();
    values.insert("email".to_string(), Value::from("redacted"));
    for (i, statement) in gate
        .translator()
        .partitioned_update_stmts("customer", &values, &locator)?
        .iter()
        .enumerate()
    {
        show(&format!("partition {}", i), statement);
    }

    for query in gate.translator().partitioned_delete_stmts("customer", &locator)? {
        println!("{}", query.sql_text);
    }

    Ok(())
}
