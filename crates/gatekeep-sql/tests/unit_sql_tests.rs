//! Unit tests for SQL generation
//!
//! Covers the dependency scenarios, dialect differences, joins,
//! injection safety and partitioning

use gatekeep_core::{ConditionNode, Operator, PartitionSpec, SchemaCatalog, Value};
use gatekeep_sql::*;
use std::collections::BTreeMap;

fn eq(address: &str, value: impl Into<Value>) -> ConditionNode {
    ConditionNode::leaf(address, Operator::Eq, value).unwrap()
}

fn task_catalog() -> SchemaCatalog {
    SchemaCatalog::new().with_roots(["manual_task_instance", "manual_task"])
}

// =============================================================================
// Dependency Scenarios
// =============================================================================

#[test]
fn test_single_leaf_select() -> anyhow::Result<()> {
    let query = SqlTranslator::new(Dialect::Generic).generate_select_query(
        &eq("fidesuser:email_address", "user1@example.com"),
        "fidesuser",
        &SelectOptions::new(),
    )?;
    assert_eq!(
        query.sql_text,
        "SELECT * FROM fidesuser WHERE email_address = :param_0"
    );
    assert_eq!(query.parameters.len(), 1);
    assert_eq!(
        query.parameter("param_0"),
        Some(&Value::from("user1@example.com"))
    );
    assert!(query.joins.is_empty());
    Ok(())
}

#[test]
fn test_and_group_on_same_column() -> anyhow::Result<()> {
    let tree = ConditionNode::and(vec![eq("status", "approved"), eq("status", "complete")])?;
    let query = translate(&tree, Dialect::Generic, "manual_task_instance")?;
    assert_eq!(query.sql_text, "(status = :param_0) AND (status = :param_1)");
    assert_eq!(query.parameters["param_0"], Value::from("approved"));
    assert_eq!(query.parameters["param_1"], Value::from("complete"));
    Ok(())
}

#[test]
fn test_in_list_placeholder_styles() -> anyhow::Result<()> {
    let tree = ConditionNode::leaf("status", Operator::InList, vec!["approved", "complete"])?;

    let postgres = translate(&tree, Dialect::Postgres, "t")?;
    assert_eq!(postgres.sql_text, "\"status\" IN :param_0");
    assert_eq!(
        postgres.parameters["param_0"],
        Value::from(vec!["approved", "complete"])
    );

    let mssql = translate(&tree, Dialect::SqlServer, "t")?;
    assert_eq!(
        mssql.sql_text,
        "[status] IN (:status_in_stmt_generated_0, :status_in_stmt_generated_1)"
    );
    assert_eq!(
        mssql.parameters["status_in_stmt_generated_1"],
        Value::from("complete")
    );

    let bigquery = translate(&tree, Dialect::BigQuery, "t")?;
    assert_eq!(
        bigquery.sql_text,
        "`status` IN (@status_in_stmt_generated_0, @status_in_stmt_generated_1)"
    );
    Ok(())
}

#[test]
fn test_or_equality_collapses_to_in() -> anyhow::Result<()> {
    let tree = ConditionNode::or(vec![
        eq("status", "approved"),
        eq("status", "complete"),
        eq("status", "approved"),
    ])?;
    let query = translate(&tree, Dialect::Postgres, "t")?;
    assert_eq!(query.sql_text, "\"status\" IN :param_0");
    assert_eq!(
        query.parameters["param_0"],
        Value::from(vec!["approved", "complete"])
    );

    let mssql = translate(&tree, Dialect::SqlServer, "t")?;
    assert_eq!(
        mssql.sql_text,
        "[status] IN (:status_in_stmt_generated_0, :status_in_stmt_generated_1)"
    );
    assert_eq!(
        mssql.parameter_order(Dialect::SqlServer),
        vec!["status_in_stmt_generated_0", "status_in_stmt_generated_1"]
    );
    assert_eq!(
        mssql.parameters["status_in_stmt_generated_0"],
        Value::from("approved")
    );
    assert_eq!(
        mssql.parameters["status_in_stmt_generated_1"],
        Value::from("complete")
    );

    let bigquery = translate(&tree, Dialect::BigQuery, "t")?;
    assert_eq!(
        bigquery.sql_text,
        "`status` IN (@status_in_stmt_generated_0, @status_in_stmt_generated_1)"
    );
    assert_eq!(bigquery.parameters.len(), 2);

    let plain = SqlTranslator::new(Dialect::Postgres)
        .with_options(TranslatorOptions::default().with_collapse_or_equality(false))
        .translate(&tree, "t")?;
    assert_eq!(
        plain.sql_text,
        "(\"status\" = :param_0) OR (\"status\" = :param_1) OR (\"status\" = :param_2)"
    );
    Ok(())
}

#[test]
fn test_snowflake_like_escape_literal() -> anyhow::Result<()> {
    let tree = ConditionNode::leaf("email", Operator::StartsWith, "a_b")?;
    let query = translate(&tree, Dialect::Snowflake, "t")?;
    assert_eq!(query.sql_text, "\"email\" LIKE :param_0 ESCAPE '\\\\'");
    assert_eq!(query.parameters["param_0"], Value::from("a\\_b%"));

    let mssql = translate(&tree, Dialect::SqlServer, "t")?;
    assert_eq!(mssql.sql_text, "[email] LIKE :param_0 ESCAPE '\\'");
    Ok(())
}

#[test]
fn test_contains_on_array_column_is_membership() -> anyhow::Result<()> {
    let catalog = SchemaCatalog::new().with_array_column("customer", "tags");
    let contains = ConditionNode::leaf("tags", Operator::Contains, "vip")?;
    let not_contains = ConditionNode::leaf("tags", Operator::NotContains, "vip")?;

    let postgres = SqlTranslator::new(Dialect::Postgres).with_catalog(catalog.clone());
    let query = postgres.translate(&contains, "customer")?;
    assert_eq!(query.sql_text, "\"tags\" @> ARRAY[:param_0]");
    assert_eq!(query.parameters["param_0"], Value::from("vip"));
    assert_eq!(
        postgres.translate(&not_contains, "customer")?.sql_text,
        "NOT (\"tags\" @> ARRAY[:param_0])"
    );

    let bigquery = SqlTranslator::new(Dialect::BigQuery).with_catalog(catalog);
    assert_eq!(
        bigquery.translate(&contains, "customer")?.sql_text,
        "EXISTS (SELECT 1 FROM UNNEST(`tags`) AS elem WHERE elem = @param_0)"
    );

    // undeclared columns keep substring matching
    let plain = translate(&contains, Dialect::Postgres, "customer")?;
    assert_eq!(plain.sql_text, "\"tags\" LIKE :param_0");
    assert_eq!(plain.parameters["param_0"], Value::from("%vip%"));
    Ok(())
}

#[test]
fn test_or_on_different_columns_is_not_collapsed() -> anyhow::Result<()> {
    let tree = ConditionNode::or(vec![eq("status", "approved"), eq("state", "approved")])?;
    let query = translate(&tree, Dialect::Generic, "t")?;
    assert_eq!(query.sql_text, "(status = :param_0) OR (state = :param_1)");
    Ok(())
}

#[test]
fn test_relationship_join_is_deduplicated() -> anyhow::Result<()> {
    let tree = ConditionNode::and(vec![
        ConditionNode::leaf("manual_task.assigned_users", Operator::ListContains, "user_1")?,
        ConditionNode::exists("manual_task.name")?,
        eq("status", "approved"),
    ])?;
    let query = SqlTranslator::new(Dialect::Generic)
        .with_catalog(task_catalog())
        .generate_select_query(&tree, "manual_task_instance", &SelectOptions::new())?;

    assert_eq!(query.joins.len(), 1);
    assert_eq!(query.joins[0].table, "manual_task");
    assert_eq!(
        query.sql_text,
        "SELECT manual_task_instance.* FROM manual_task_instance \
         INNER JOIN manual_task ON manual_task_instance.manual_task_id = manual_task.id \
         WHERE (manual_task.assigned_users @> ARRAY[:param_0]) AND (manual_task.name IS NOT NULL) \
         AND (manual_task_instance.status = :param_1)"
    );
    Ok(())
}

#[test]
fn test_catalog_relationship_overrides_convention() -> anyhow::Result<()> {
    let catalog = SchemaCatalog::new().with_relationship(
        gatekeep_core::Relationship::foreign_key("customer", "address", "billing_address_id", "id"),
    );
    let query = SqlTranslator::new(Dialect::Postgres)
        .with_catalog(catalog)
        .translate(&eq("address:city", "Example"), "customer")?;
    assert_eq!(query.sql_text, "\"address\".\"city\" = :param_0");
    assert_eq!(
        query.joins[0].render(Dialect::Postgres)?,
        "INNER JOIN \"address\" ON \"customer\".\"billing_address_id\" = \"address\".\"id\""
    );
    Ok(())
}

// =============================================================================
// Safety and Determinism
// =============================================================================

#[test]
fn test_values_never_reach_sql_text() -> anyhow::Result<()> {
    let hostile = "x'; DROP TABLE customer; --";
    let tree = ConditionNode::or(vec![
        eq("email", hostile),
        ConditionNode::leaf("name", Operator::Contains, hostile)?,
        ConditionNode::leaf("tags", Operator::ListContainsAny, vec![hostile, "b"])?,
    ])?;
    for dialect in Dialect::ALL {
        let query = match translate(&tree, dialect, "customer") {
            Ok(query) => query,
            Err(SqlError::UnsupportedOperator { .. }) => continue,
            Err(e) => return Err(e.into()),
        };
        assert!(!query.sql_text.contains("DROP"), "{}: {}", dialect, query.sql_text);
        assert!(query.parameters.values().any(|v| *v == Value::from(hostile)));
    }
    Ok(())
}

#[test]
fn test_hostile_identifier_rejected_on_generic() {
    let err = translate(&eq("email; DROP", "x"), Dialect::Generic, "customer").unwrap_err();
    assert!(matches!(err, SqlError::Translation(_)));
}

#[test]
fn test_translation_is_deterministic() -> anyhow::Result<()> {
    let tree = ConditionNode::and(vec![
        eq("a", 1),
        ConditionNode::leaf("b", Operator::NotInList, vec![1, 2])?,
        ConditionNode::leaf("c", Operator::StartsWith, "x")?,
    ])?;
    for dialect in Dialect::ALL {
        let first = translate(&tree, dialect, "t")?;
        let second = translate(&tree, dialect, "t")?;
        assert_eq!(first, second);
    }
    Ok(())
}

#[test]
fn test_parameter_names_unique_and_referenced() -> anyhow::Result<()> {
    let tree = ConditionNode::and(vec![
        eq("status", "a"),
        ConditionNode::leaf("status", Operator::InList, vec!["b", "c"])?,
        ConditionNode::leaf("status", Operator::NotInList, vec!["d"])?,
    ])?;
    for dialect in [Dialect::Postgres, Dialect::SqlServer, Dialect::BigQuery] {
        let query = SqlTranslator::new(dialect)
            .with_options(TranslatorOptions::default().with_param_naming(ParamNaming::FieldDerived))
            .generate_select_query(&tree, "t", &SelectOptions::new().with_limit(10))?;
        let order = query.parameter_order(dialect);
        assert_eq!(order.len(), query.parameters.len(), "{}", query.sql_text);
    }
    Ok(())
}

#[test]
fn test_count_query_has_no_pagination() -> anyhow::Result<()> {
    let query = SqlTranslator::new(Dialect::MySql)
        .generate_count_query(&eq("status", "approved"), "manual_task_instance")?;
    assert_eq!(
        query.sql_text,
        "SELECT COUNT(*) FROM `manual_task_instance` WHERE `status` = :param_0"
    );
    assert!(!query.sql_text.contains("LIMIT"));
    Ok(())
}

#[test]
fn test_selected_fields_and_offset_only() -> anyhow::Result<()> {
    let query = SqlTranslator::new(Dialect::Postgres).generate_select_query(
        &eq("status", "open"),
        "customer",
        &SelectOptions::new()
            .with_fields(["id", "profile.email"])
            .with_offset(5),
    )?;
    assert_eq!(
        query.sql_text,
        "SELECT \"id\", \"profile\"->>'email' FROM \"customer\" WHERE \"status\" = :param_0 OFFSET :offset"
    );
    assert_eq!(query.parameters["offset"], Value::from(5));
    Ok(())
}

// =============================================================================
// Partitioning
// =============================================================================

fn partitioned_catalog() -> SchemaCatalog {
    SchemaCatalog::new().with_partition(
        "events",
        PartitionSpec::TimeBased {
            field: "created_at".to_string(),
            start: "2024-01-01".to_string(),
            end: "2024-01-10".to_string(),
            interval: "3 DAY".to_string(),
        },
    )
}

#[test]
fn test_partitioned_select_per_range() -> anyhow::Result<()> {
    let queries = SqlTranslator::new(Dialect::BigQuery)
        .with_catalog(partitioned_catalog())
        .partitioned_select_queries(&eq("user_id", 7), "events", &SelectOptions::new())?;
    assert_eq!(queries.len(), 3);
    assert_eq!(
        queries[0].sql_text,
        "SELECT * FROM `events` WHERE (`user_id` = @param_0) AND \
         (`created_at` >= @partition_start AND `created_at` < @partition_end)"
    );
    assert_eq!(queries[0].parameters["partition_start"], Value::from("2024-01-01"));
    assert_eq!(queries[0].parameters["partition_end"], Value::from("2024-01-04"));
    assert!(queries[2].sql_text.contains("`created_at` <= @partition_end"));
    assert_eq!(queries[2].parameters["partition_end"], Value::from("2024-01-10"));
    for query in &queries {
        assert_eq!(query.parameters["param_0"], Value::from(7));
    }
    Ok(())
}

#[test]
fn test_non_partitioning_dialect_emits_one_statement() -> anyhow::Result<()> {
    let translator = SqlTranslator::new(Dialect::Postgres).with_catalog(partitioned_catalog());
    let queries =
        translator.partitioned_select_queries(&eq("user_id", 7), "events", &SelectOptions::new())?;
    assert_eq!(queries.len(), 1);
    assert!(!queries[0].sql_text.contains("partition_start"));

    let deletes = translator.partitioned_delete_stmts("events", &eq("user_id", 7))?;
    assert_eq!(deletes.len(), 1);
    Ok(())
}

#[test]
fn test_partition_where_clauses_verbatim() -> anyhow::Result<()> {
    let catalog = SchemaCatalog::new().with_partition(
        "events",
        PartitionSpec::WhereClauses(vec![
            "`region` = 'eu'".to_string(),
            "`region` = 'us'".to_string(),
        ]),
    );
    let translator = SqlTranslator::new(Dialect::BigQuery).with_catalog(catalog);
    let deletes = translator.partitioned_delete_stmts("events", &eq("user_id", 7))?;
    assert_eq!(
        deletes[1].sql_text,
        "DELETE FROM `events` WHERE (`user_id` = @param_0) AND (`region` = 'us')"
    );

    let mut values = BTreeMap::new();
    values.insert("email".to_string(), Value::Null);
    let updates = translator.partitioned_update_stmts("events", &values, &eq("user_id", 7))?;
    assert_eq!(updates.len(), 2);
    let UpdateStatement::Structured(update) = &updates[0] else {
        panic!("BigQuery NULL update should be structured");
    };
    assert_eq!(update.where_sql, "(`user_id` = @param_1) AND (`region` = 'eu')");
    Ok(())
}

#[test]
fn test_invalid_partition_interval() {
    let catalog = SchemaCatalog::new().with_partition(
        "events",
        PartitionSpec::TimeBased {
            field: "created_at".to_string(),
            start: "2024-01-01".to_string(),
            end: "2024-01-10".to_string(),
            interval: "0 DAY".to_string(),
        },
    );
    let err = SqlTranslator::new(Dialect::BigQuery)
        .with_catalog(catalog)
        .partitioned_select_queries(&eq("user_id", 7), "events", &SelectOptions::new())
        .unwrap_err();
    assert!(matches!(err, SqlError::InvalidPartition(_)));
}
