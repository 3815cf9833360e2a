//! Caller-supplied schema catalog

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// How a relationship join is expressed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JoinOn {
    /// `<from>.<column> = <to>.<references>`
    ForeignKey { column: String, references: String },
    /// Raw `ON` condition taken verbatim from the catalog
    Expression { condition: String },
}

/// A join edge from a primary root to a related root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub from: String,
    pub to: String,
    pub on: JoinOn,
}

impl Relationship {
    pub fn foreign_key(
        from: impl Into<String>,
        to: impl Into<String>,
        column: impl Into<String>,
        references: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            on: JoinOn::ForeignKey {
                column: column.into(),
                references: references.into(),
            },
        }
    }

    pub fn expression(
        from: impl Into<String>,
        to: impl Into<String>,
        condition: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            on: JoinOn::Expression {
                condition: condition.into(),
            },
        }
    }

    /// Conventional edge: `<from>.<singular(to)>_id = <to>.id`
    pub fn conventional(from: impl Into<String>, to: impl Into<String>) -> Self {
        let to = to.into();
        let column = format!("{}_id", singular(&to));
        Self::foreign_key(from, to, column, "id")
    }
}

/// Partitioning declared for one root table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionSpec {
    /// Consecutive `[lo, hi)` buckets of `interval` between `start` and `end`
    TimeBased {
        field: String,
        start: String,
        end: String,
        interval: String,
    },
    /// Explicit partition WHERE fragments
    WhereClauses(Vec<String>),
}

/// Schema knowledge the resolver and translator need.
///
/// Supplied by the caller as plain data; nothing here is fetched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaCatalog {
    /// Known root table / collection names
    pub roots: BTreeSet<String>,
    /// Dataset prefixes accepted in `dataset:collection:field` addresses
    pub datasets: BTreeSet<String>,
    /// Explicit join edges
    pub relationships: Vec<Relationship>,
    /// Logical name → physical column or raw SQL expression
    pub field_mapping: BTreeMap<String, String>,
    /// Array-valued columns as `<root>.<path>`; `contains` on them is membership
    pub array_columns: BTreeSet<String>,
    /// Partition spec per root, written as `{time_based: {...}}` or `{where_clauses: [...]}`
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    pub partitioning: BTreeMap<String, PartitionSpec>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.roots.insert(root.into());
        self
    }

    pub fn with_roots<I, S>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roots.extend(roots.into_iter().map(Into::into));
        self
    }

    pub fn with_dataset(mut self, dataset: impl Into<String>) -> Self {
        self.datasets.insert(dataset.into());
        self
    }

    /// Register a relationship. Both ends become known roots.
    pub fn with_relationship(mut self, relationship: Relationship) -> Self {
        self.roots.insert(relationship.from.clone());
        self.roots.insert(relationship.to.clone());
        self.relationships.push(relationship);
        self
    }

    pub fn with_field_mapping(
        mut self,
        logical: impl Into<String>,
        physical: impl Into<String>,
    ) -> Self {
        self.field_mapping.insert(logical.into(), physical.into());
        self
    }

    pub fn with_array_column(mut self, root: &str, path: &str) -> Self {
        self.array_columns.insert(format!("{}.{}", root, path));
        self
    }

    pub fn with_partition(mut self, root: impl Into<String>, spec: PartitionSpec) -> Self {
        self.partitioning.insert(root.into(), spec);
        self
    }

    pub fn is_root(&self, name: &str) -> bool {
        self.roots.contains(name)
    }

    pub fn is_dataset(&self, name: &str) -> bool {
        self.datasets.contains(name)
    }

    /// Explicit edge registered from `from` to `to`
    pub fn relationship(&self, from: &str, to: &str) -> Option<&Relationship> {
        self.relationships
            .iter()
            .find(|r| r.from == from && r.to == to)
    }

    pub fn mapped(&self, key: &str) -> Option<&str> {
        self.field_mapping.get(key).map(String::as_str)
    }

    pub fn is_array_column(&self, root: &str, path: &str) -> bool {
        self.array_columns.contains(&format!("{}.{}", root, path))
    }

    pub fn partition(&self, root: &str) -> Option<&PartitionSpec> {
        self.partitioning.get(root)
    }
}

/// Naive English singular used for conventional foreign-key names
pub fn singular(name: &str) -> String {
    if let Some(stem) = name.strip_suffix("ies") {
        return format!("{}y", stem);
    }
    for suffix in ["sses", "shes", "ches", "xes"] {
        if name.ends_with(suffix) {
            return name[..name.len() - 2].to_string();
        }
    }
    if name.ends_with('s') && !name.ends_with("ss") && !name.ends_with("us") {
        return name[..name.len() - 1].to_string();
    }
    name.to_string()
}
