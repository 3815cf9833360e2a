//! Operator registry
//!
//! A single table maps each operator to its in-memory comparison and to the
//! SQL shape the translator renders for it. Both backends read the same
//! table, so adding an operator means adding one entry here.

mod compare;

pub use compare::{parse_datetime, TypeMismatch};

use crate::condition::Operator;
use crate::error::{CoreError, Result};
use crate::types::Value;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::fmt;

/// In-memory comparison. Receives a present, non-null field value.
pub type CompareFn = fn(&Value, Option<&Value>) -> std::result::Result<bool, TypeMismatch>;

/// Where the wildcard goes in a LIKE pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikePattern {
    /// `%value%`
    Contains,
    /// `value%`
    Prefix,
    /// `%value`
    Suffix,
}

impl LikePattern {
    /// Wrap an already-escaped literal with wildcards
    pub fn wrap(&self, escaped: &str) -> String {
        match self {
            LikePattern::Contains => format!("%{}%", escaped),
            LikePattern::Prefix => format!("{}%", escaped),
            LikePattern::Suffix => format!("%{}", escaped),
        }
    }
}

/// Shape of the SQL predicate for an operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlShape {
    /// `<col> <symbol> <param>`
    Compare(&'static str),
    /// `<col> IS NULL`
    IsNull,
    /// `<col> IS NOT NULL`
    IsNotNull,
    /// `<col> [NOT] LIKE <param>`
    Like { pattern: LikePattern, negated: bool },
    /// `<col> [NOT] IN (...)`
    In { negated: bool },
    /// Array column holds a scalar
    ArrayContains,
    /// Array column shares at least one element with a list
    ArrayOverlap,
}

/// One registered operator
#[derive(Clone)]
pub struct OperatorEntry {
    pub operator: Operator,
    pub compare: CompareFn,
    pub sql: SqlShape,
}

impl fmt::Debug for OperatorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorEntry")
            .field("operator", &self.operator)
            .field("sql", &self.sql)
            .finish()
    }
}

impl OperatorEntry {
    pub fn new(operator: Operator, compare: CompareFn, sql: SqlShape) -> Self {
        Self {
            operator,
            compare,
            sql,
        }
    }

    /// Compare a possibly-missing field value.
    ///
    /// Missing and null values never satisfy an operator except `not_exists`.
    pub fn compare(
        &self,
        actual: Option<&Value>,
        expected: Option<&Value>,
    ) -> std::result::Result<bool, TypeMismatch> {
        match actual {
            None | Some(Value::Null) => Ok(self.operator == Operator::NotExists),
            Some(value) => (self.compare)(value, expected),
        }
    }

    /// SQL shape for a concrete operand.
    ///
    /// `eq`/`neq` against a list of two or more values lower to `IN`/`NOT IN`.
    pub fn sql_shape_for(&self, value: Option<&Value>) -> SqlShape {
        match (self.operator, value) {
            (Operator::Eq, Some(Value::Array(items))) if items.len() > 1 => {
                SqlShape::In { negated: false }
            }
            (Operator::Neq, Some(Value::Array(items))) if items.len() > 1 => {
                SqlShape::In { negated: true }
            }
            _ => self.sql,
        }
    }
}

/// Table of operator entries
#[derive(Debug, Clone, Default)]
pub struct OperatorRegistry {
    entries: HashMap<Operator, OperatorEntry>,
}

lazy_static! {
    static ref GLOBAL: OperatorRegistry = OperatorRegistry::standard();
}

fn standard_entries() -> Vec<OperatorEntry> {
    use Operator::*;
    vec![
        OperatorEntry::new(Eq, compare::eq, SqlShape::Compare("=")),
        OperatorEntry::new(Neq, compare::neq, SqlShape::Compare("<>")),
        OperatorEntry::new(Lt, compare::lt, SqlShape::Compare("<")),
        OperatorEntry::new(Lte, compare::lte, SqlShape::Compare("<=")),
        OperatorEntry::new(Gt, compare::gt, SqlShape::Compare(">")),
        OperatorEntry::new(Gte, compare::gte, SqlShape::Compare(">=")),
        OperatorEntry::new(Exists, compare::exists, SqlShape::IsNotNull),
        OperatorEntry::new(NotExists, compare::not_exists, SqlShape::IsNull),
        OperatorEntry::new(
            Contains,
            compare::contains,
            SqlShape::Like {
                pattern: LikePattern::Contains,
                negated: false,
            },
        ),
        OperatorEntry::new(
            NotContains,
            compare::not_contains,
            SqlShape::Like {
                pattern: LikePattern::Contains,
                negated: true,
            },
        ),
        OperatorEntry::new(
            StartsWith,
            compare::starts_with,
            SqlShape::Like {
                pattern: LikePattern::Prefix,
                negated: false,
            },
        ),
        OperatorEntry::new(
            EndsWith,
            compare::ends_with,
            SqlShape::Like {
                pattern: LikePattern::Suffix,
                negated: false,
            },
        ),
        OperatorEntry::new(InList, compare::in_list, SqlShape::In { negated: false }),
        OperatorEntry::new(
            NotInList,
            compare::not_in_list,
            SqlShape::In { negated: true },
        ),
        OperatorEntry::new(ListContains, compare::list_contains, SqlShape::ArrayContains),
        OperatorEntry::new(
            ListContainsAny,
            compare::list_contains_any,
            SqlShape::ArrayOverlap,
        ),
    ]
}

impl OperatorRegistry {
    /// Process-wide registry with every standard operator, built once
    pub fn global() -> &'static OperatorRegistry {
        &GLOBAL
    }

    /// Fresh registry with every standard operator
    pub fn standard() -> Self {
        Self::builder().with_standard().build()
    }

    pub fn builder() -> OperatorRegistryBuilder {
        OperatorRegistryBuilder::default()
    }

    /// Look up an operator, failing if it is not registered
    pub fn get(&self, operator: Operator) -> Result<&OperatorEntry> {
        self.entries
            .get(&operator)
            .ok_or_else(|| CoreError::UnsupportedOperator(operator.to_string()))
    }

    pub fn contains(&self, operator: Operator) -> bool {
        self.entries.contains_key(&operator)
    }

    /// Registered operators in declaration order
    pub fn operators(&self) -> Vec<Operator> {
        let mut ops: Vec<Operator> = self.entries.keys().copied().collect();
        ops.sort();
        ops
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builder for custom registries
#[derive(Debug, Default)]
pub struct OperatorRegistryBuilder {
    entries: HashMap<Operator, OperatorEntry>,
}

impl OperatorRegistryBuilder {
    pub fn with_standard(mut self) -> Self {
        for entry in standard_entries() {
            self.entries.insert(entry.operator, entry);
        }
        self
    }

    /// Add or replace an entry
    pub fn register(mut self, entry: OperatorEntry) -> Self {
        self.entries.insert(entry.operator, entry);
        self
    }

    pub fn without(mut self, operator: Operator) -> Self {
        self.entries.remove(&operator);
        self
    }

    pub fn build(self) -> OperatorRegistry {
        log::debug!("operator registry built with {} entries", self.entries.len());
        OperatorRegistry {
            entries: self.entries,
        }
    }
}
