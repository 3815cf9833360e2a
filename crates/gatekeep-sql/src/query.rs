//! Compiled query types

use crate::dialect::Dialect;
use crate::error::Result;
use gatekeep_core::{JoinOn, Relationship, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An `INNER JOIN` needed to reach a related root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinSpec {
    /// Primary root the join starts from
    pub from: String,
    /// Joined table
    pub table: String,
    pub on: JoinOn,
}

impl JoinSpec {
    pub fn from_relationship(relationship: &Relationship) -> Self {
        Self {
            from: relationship.from.clone(),
            table: relationship.to.clone(),
            on: relationship.on.clone(),
        }
    }

    pub fn render(&self, dialect: Dialect) -> Result<String> {
        let table = dialect.quote(&self.table)?;
        let on = match &self.on {
            JoinOn::ForeignKey { column, references } => format!(
                "{}.{} = {}.{}",
                dialect.quote(&self.from)?,
                dialect.quote(column)?,
                table,
                dialect.quote(references)?
            ),
            JoinOn::Expression { condition } => condition.clone(),
        };
        Ok(format!("INNER JOIN {} ON {}", table, on))
    }
}

/// Parameterized SQL ready for execution by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledQuery {
    pub sql_text: String,
    /// Named bindings; list values bind a whole `IN` tuple
    pub parameters: BTreeMap<String, Value>,
    pub joins: Vec<JoinSpec>,
}

impl CompiledQuery {
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    /// Parameter names in the order their placeholders appear in `sql_text`
    pub fn parameter_order(&self, dialect: Dialect) -> Vec<&str> {
        let mut found: Vec<(usize, &str)> = self
            .parameters
            .keys()
            .filter_map(|name| {
                let placeholder = dialect.placeholder(name);
                find_placeholder(&self.sql_text, &placeholder).map(|pos| (pos, name.as_str()))
            })
            .collect();
        found.sort();
        found.into_iter().map(|(_, name)| name).collect()
    }
}

/// Position of a placeholder not followed by another identifier character
fn find_placeholder(sql: &str, placeholder: &str) -> Option<usize> {
    let mut start = 0;
    while let Some(offset) = sql[start..].find(placeholder) {
        let pos = start + offset;
        let end = pos + placeholder.len();
        let boundary = sql[end..]
            .chars()
            .next()
            .map(|c| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(true);
        if boundary {
            return Some(pos);
        }
        start = end;
    }
    None
}
