//! Record accessors
//!
//! The evaluator never looks at record data directly. It resolves each field
//! address and asks an accessor for the value at the resolved location.

use super::field_lookup::navigate;
use crate::error::{Result, RuntimeError};
use gatekeep_core::{ResolvedFieldAddress, Value};
use std::collections::BTreeMap;

/// Source of field values for in-memory evaluation
pub trait RecordAccessor {
    /// Value at the resolved location; `None` when absent
    fn get(&self, field: &ResolvedFieldAddress) -> Result<Option<Value>>;

    /// Root names this accessor can answer for
    fn roots(&self) -> Vec<String> {
        Vec::new()
    }

    /// Root that unqualified addresses resolve against
    fn primary_root(&self) -> Option<&str> {
        None
    }
}

impl<T: RecordAccessor + ?Sized> RecordAccessor for &T {
    fn get(&self, field: &ResolvedFieldAddress) -> Result<Option<Value>> {
        (**self).get(field)
    }

    fn roots(&self) -> Vec<String> {
        (**self).roots()
    }

    fn primary_root(&self) -> Option<&str> {
        (**self).primary_root()
    }
}

/// Nested documents keyed by root name
#[derive(Debug, Clone, Default)]
pub struct RecordGraph {
    roots: BTreeMap<String, Value>,
    primary: Option<String>,
}

impl RecordGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(mut self, name: impl Into<String>, document: impl Into<Value>) -> Self {
        self.roots.insert(name.into(), document.into());
        self
    }

    pub fn with_primary(mut self, name: impl Into<String>) -> Self {
        self.primary = Some(name.into());
        self
    }

    /// Build from a JSON object whose top-level keys are root names
    pub fn from_json(json: serde_json::Value) -> Result<Self> {
        match Value::from(json) {
            Value::Object(map) => Ok(Self {
                roots: map,
                primary: None,
            }),
            other => Err(RuntimeError::InvalidRecord(format!(
                "record graph must be an object of roots, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn root(&self, name: &str) -> Option<&Value> {
        self.roots.get(name)
    }
}

impl RecordAccessor for RecordGraph {
    fn get(&self, field: &ResolvedFieldAddress) -> Result<Option<Value>> {
        Ok(self
            .roots
            .get(&field.root_identifier)
            .and_then(|document| navigate(document, &field.effective_path())))
    }

    fn roots(&self) -> Vec<String> {
        self.roots.keys().cloned().collect()
    }

    fn primary_root(&self) -> Option<&str> {
        self.primary.as_deref()
    }
}

/// A single flat row, as returned by a SQL driver.
///
/// Column names may contain dots (`profile.verified`) or be qualified with a
/// joined table (`manual_task.assigned_users`); those are matched literally
/// before nested navigation is attempted.
#[derive(Debug, Clone)]
pub struct FlatRow {
    root: String,
    columns: BTreeMap<String, Value>,
}

impl FlatRow {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            columns: BTreeMap::new(),
        }
    }

    pub fn with_column(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.columns.insert(name.into(), value.into());
        self
    }

    /// Build from a JSON object of column → value
    pub fn from_json(root: impl Into<String>, json: serde_json::Value) -> Result<Self> {
        match Value::from(json) {
            Value::Object(columns) => Ok(Self {
                root: root.into(),
                columns,
            }),
            other => Err(RuntimeError::InvalidRecord(format!(
                "row must be an object of columns, got {}",
                other.type_name()
            ))),
        }
    }
}

impl RecordAccessor for FlatRow {
    fn get(&self, field: &ResolvedFieldAddress) -> Result<Option<Value>> {
        let path = field.effective_path();
        let dotted = path.join(".");

        if field.root_identifier != self.root {
            let qualified = format!("{}.{}", field.root_identifier, dotted);
            return Ok(self.columns.get(&qualified).cloned());
        }

        if let Some(value) = self.columns.get(&dotted) {
            return Ok(Some(value.clone()));
        }
        let Some((column, rest)) = path.split_first() else {
            return Ok(None);
        };
        Ok(self
            .columns
            .get(column)
            .and_then(|value| navigate(value, rest)))
    }

    fn roots(&self) -> Vec<String> {
        vec![self.root.clone()]
    }

    fn primary_root(&self) -> Option<&str> {
        Some(&self.root)
    }
}
