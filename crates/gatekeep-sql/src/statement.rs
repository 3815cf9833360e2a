//! UPDATE / masking / DELETE statements
//!
//! The locator condition goes through the same lowering as SELECT queries,
//! but it must stay on the statement's own table: a locator that needs a
//! join is rejected.

use crate::dialect::NestedUpdate;
use crate::error::{Result, SqlError};
use crate::partition::{restrict, PartitionClause};
use crate::query::CompiledQuery;
use crate::render::{json_path, quote_literal};
use crate::translator::{Lowering, SqlTranslator};
use gatekeep_core::{ConditionNode, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An update the caller must run through its driver's update builder.
///
/// Produced where the driver cannot bind NULL into templated text
/// (BigQuery). Nested struct assignments are already merged: each entry
/// in `values` holds the complete new column value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredUpdate {
    pub table: String,
    /// Column → complete new value
    pub values: BTreeMap<String, Value>,
    pub where_sql: String,
    pub parameters: BTreeMap<String, Value>,
}

/// Result of update generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UpdateStatement {
    Text(CompiledQuery),
    Structured(StructuredUpdate),
}

impl UpdateStatement {
    pub fn is_structured(&self) -> bool {
        matches!(self, UpdateStatement::Structured(_))
    }

    pub fn as_text(&self) -> Option<&CompiledQuery> {
        match self {
            UpdateStatement::Text(query) => Some(query),
            UpdateStatement::Structured(_) => None,
        }
    }

    pub fn parameters(&self) -> &BTreeMap<String, Value> {
        match self {
            UpdateStatement::Text(query) => &query.parameters,
            UpdateStatement::Structured(update) => &update.parameters,
        }
    }
}

/// Assignments to one top-level column
enum Assignment {
    Whole(Value),
    Nested(Vec<(Vec<String>, Value)>),
}

/// A lowered UPDATE that can still take a partition restriction
pub(crate) struct UpdateParts {
    table: String,
    head: String,
    values: BTreeMap<String, Value>,
    set_parameters: BTreeMap<String, Value>,
    where_sql: String,
    where_parameters: BTreeMap<String, Value>,
    structured: bool,
}

impl UpdateParts {
    pub(crate) fn finish(&self, clause: Option<&PartitionClause>) -> UpdateStatement {
        let (where_sql, where_parameters) = restrict(&self.where_sql, &self.where_parameters, clause);
        if self.structured {
            return UpdateStatement::Structured(StructuredUpdate {
                table: self.table.clone(),
                values: self.values.clone(),
                where_sql,
                parameters: where_parameters,
            });
        }
        let mut parameters = self.set_parameters.clone();
        parameters.extend(where_parameters);
        UpdateStatement::Text(CompiledQuery {
            sql_text: format!("{} WHERE {}", self.head, where_sql),
            parameters,
            joins: Vec::new(),
        })
    }
}

/// A lowered DELETE that can still take a partition restriction
pub(crate) struct DeleteParts {
    head: String,
    where_sql: String,
    parameters: BTreeMap<String, Value>,
}

impl DeleteParts {
    pub(crate) fn finish(&self, clause: Option<&PartitionClause>) -> CompiledQuery {
        let (where_sql, parameters) = restrict(&self.where_sql, &self.parameters, clause);
        CompiledQuery {
            sql_text: format!("{} WHERE {}", self.head, where_sql),
            parameters,
            joins: Vec::new(),
        }
    }
}

fn lower_locator(lowering: &mut Lowering<'_>, table: &str, locator: &ConditionNode) -> Result<String> {
    lowering.prepare(locator)?;
    if let Some(join) = lowering.joins.first() {
        return Err(SqlError::translation(format!(
            "locator for {} cannot reach {} through a join",
            table, join.table
        )));
    }
    lowering.render_node(locator)
}

/// `{a,b}` path for jsonb_set
fn jsonb_path(keys: &[String]) -> String {
    let keys: Vec<String> = keys
        .iter()
        .map(|k| {
            if k.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                k.clone()
            } else {
                format!("\"{}\"", k.replace('\\', "\\\\").replace('"', "\\\""))
            }
        })
        .collect();
    quote_literal(&format!("{{{}}}", keys.join(",")))
}

/// Set `path` inside a struct value, creating intermediate objects.
///
/// Arrays follow field lookup: a numeric segment picks one element, any
/// other segment applies to every non-null element.
fn patch(target: &mut Value, path: &[String], value: Value) -> Result<()> {
    let Some((key, rest)) = path.split_first() else {
        *target = value;
        return Ok(());
    };
    if target.is_null() {
        *target = Value::Object(BTreeMap::new());
    }
    if let Value::Array(items) = target {
        if let Ok(index) = key.parse::<usize>() {
            let len = items.len();
            let item = items.get_mut(index).ok_or_else(|| {
                SqlError::translation(format!("index {} is out of range for {} items", index, len))
            })?;
            return patch(item, rest, value);
        }
        for item in items.iter_mut().filter(|item| !item.is_null()) {
            patch(item, path, value.clone())?;
        }
        return Ok(());
    }
    let Value::Object(map) = target else {
        return Err(SqlError::translation(format!(
            "cannot set '{}' inside a {}",
            key,
            target.type_name()
        )));
    };
    patch(map.entry(key.clone()).or_insert(Value::Null), rest, value)
}

impl SqlTranslator {
    /// `UPDATE <table> SET <col> = :p, ... WHERE <locator>`.
    ///
    /// Keys of `values` are physical top-level columns.
    pub fn generate_update_stmt(
        &self,
        table: &str,
        values: &BTreeMap<String, Value>,
        locator: &ConditionNode,
    ) -> Result<UpdateStatement> {
        Ok(self.update_parts(table, values, locator)?.finish(None))
    }

    /// Mask fields addressed like condition leaves, nested paths included.
    ///
    /// Dialects that replace whole structs need `current_row` to patch.
    /// That is a read-modify-write: a concurrent writer between the read
    /// and this update is overwritten.
    pub fn generate_masking_stmt(
        &self,
        table: &str,
        masks: &BTreeMap<String, Value>,
        locator: &ConditionNode,
        current_row: Option<&Value>,
    ) -> Result<UpdateStatement> {
        let lowering = Lowering::new(self, table);
        let mut assignments: Vec<(Vec<String>, Value)> = Vec::with_capacity(masks.len());
        for (address, value) in masks {
            let resolved = lowering.resolve(address)?;
            if resolved.is_relationship_crossing {
                return Err(SqlError::translation(format!(
                    "'{}' is not a column of {}",
                    address, table
                )));
            }
            if resolved.raw_expression().is_some() {
                return Err(SqlError::translation(format!(
                    "'{}' maps to an expression and cannot be assigned",
                    address
                )));
            }
            assignments.push((resolved.effective_path(), value.clone()));
        }
        Ok(self
            .build_update(lowering, table, assignments, locator, current_row)?
            .finish(None))
    }

    /// `DELETE FROM <table> WHERE <locator>`
    pub fn generate_delete_stmt(&self, table: &str, locator: &ConditionNode) -> Result<CompiledQuery> {
        Ok(self.delete_parts(table, locator)?.finish(None))
    }

    pub(crate) fn update_parts(
        &self,
        table: &str,
        values: &BTreeMap<String, Value>,
        locator: &ConditionNode,
    ) -> Result<UpdateParts> {
        let assignments = values
            .iter()
            .map(|(column, value)| (vec![column.clone()], value.clone()))
            .collect();
        self.build_update(Lowering::new(self, table), table, assignments, locator, None)
    }

    pub(crate) fn delete_parts(&self, table: &str, locator: &ConditionNode) -> Result<DeleteParts> {
        let mut lowering = Lowering::new(self, table);
        let where_sql = lower_locator(&mut lowering, table, locator)?;
        Ok(DeleteParts {
            head: format!("DELETE FROM {}", self.dialect().quote(table)?),
            where_sql,
            parameters: lowering.parameters,
        })
    }

    fn build_update(
        &self,
        mut lowering: Lowering<'_>,
        table: &str,
        assignments: Vec<(Vec<String>, Value)>,
        locator: &ConditionNode,
        current_row: Option<&Value>,
    ) -> Result<UpdateParts> {
        if assignments.is_empty() {
            return Err(SqlError::translation(format!(
                "update of {} assigns nothing",
                table
            )));
        }

        let mut by_column: BTreeMap<String, Assignment> = BTreeMap::new();
        for (path, value) in assignments {
            let Some((column, rest)) = path.split_first() else {
                return Err(SqlError::translation("assignment without a column"));
            };
            match (by_column.get_mut(column), rest.is_empty()) {
                (None, true) => {
                    by_column.insert(column.clone(), Assignment::Whole(value));
                }
                (None, false) => {
                    by_column.insert(column.clone(), Assignment::Nested(vec![(rest.to_vec(), value)]));
                }
                (Some(Assignment::Nested(list)), false) => list.push((rest.to_vec(), value)),
                (Some(_), _) => {
                    return Err(SqlError::translation(format!(
                        "column '{}' is both replaced and patched",
                        column
                    )))
                }
            }
        }

        let dialect = self.dialect();
        let policy = dialect.policy();
        let mut set_clauses = Vec::with_capacity(by_column.len());
        let mut values = BTreeMap::new();
        for (column, assignment) in by_column {
            let quoted = dialect.quote(&column)?;
            let expr = match assignment {
                Assignment::Whole(value) => {
                    values.insert(column.clone(), value.clone());
                    lowering.bind(&column, value)
                }
                Assignment::Nested(patches) => match policy.nested_update {
                    NestedUpdate::PostgresJsonbSet => {
                        let mut expr = quoted.clone();
                        for (keys, value) in patches {
                            let hint = format!("{}_{}", column, keys.join("_"));
                            let ph = lowering.bind(&hint, Value::String(value.to_json_string()));
                            expr = format!(
                                "jsonb_set({}, {}, CAST({} AS jsonb))",
                                expr,
                                jsonb_path(&keys),
                                ph
                            );
                        }
                        expr
                    }
                    NestedUpdate::MySqlJsonSet => {
                        let mut args = vec![quoted.clone()];
                        for (keys, value) in patches {
                            let hint = format!("{}_{}", column, keys.join("_"));
                            args.push(json_path(&keys));
                            args.push(lowering.bind(&hint, value));
                        }
                        format!("JSON_SET({})", args.join(", "))
                    }
                    NestedUpdate::SqlServerJsonModify => {
                        let mut expr = quoted.clone();
                        for (keys, value) in patches {
                            let hint = format!("{}_{}", column, keys.join("_"));
                            let ph = lowering.bind(&hint, value);
                            expr = format!("JSON_MODIFY({}, {}, {})", expr, json_path(&keys), ph);
                        }
                        expr
                    }
                    NestedUpdate::StructReplace => {
                        let row = current_row.ok_or_else(|| {
                            SqlError::translation(format!(
                                "patching {}.{} on {} needs the current row",
                                table, column, dialect
                            ))
                        })?;
                        let mut current = row
                            .as_object()
                            .and_then(|o| o.get(&column))
                            .cloned()
                            .unwrap_or(Value::Null);
                        for (keys, value) in patches {
                            patch(&mut current, &keys, value)?;
                        }
                        tracing::debug!("replacing struct {}.{} from current row", table, column);
                        values.insert(column.clone(), current.clone());
                        lowering.bind(&column, current)
                    }
                },
            };
            set_clauses.push(format!("{} = {}", quoted, expr));
        }
        let set_parameters = lowering.parameters.clone();

        let where_sql = lower_locator(&mut lowering, table, locator)?;
        let where_parameters = lowering
            .parameters
            .into_iter()
            .filter(|(name, _)| !set_parameters.contains_key(name))
            .collect();

        let structured = policy.structured_null_updates && values.values().any(Value::is_null);
        if structured {
            tracing::debug!("update of {} sets NULL; emitting structured update", table);
        }

        Ok(UpdateParts {
            table: table.to_string(),
            head: format!(
                "UPDATE {} SET {}",
                dialect.quote(table)?,
                set_clauses.join(", ")
            ),
            values,
            set_parameters,
            where_sql,
            where_parameters,
            structured,
        })
    }
}
