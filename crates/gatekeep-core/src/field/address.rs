//! Field-address resolution

use super::catalog::{Relationship, SchemaCatalog};
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Structural meaning of a field address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedFieldAddress {
    /// Address as written in the condition
    pub address: String,
    pub root_identifier: String,
    pub path_segments: Vec<String>,
    pub is_relationship_crossing: bool,
    /// Physical column or raw SQL expression from the field mapping
    pub mapped: Option<String>,
    /// Join edge from the primary root, set when crossing
    pub relationship: Option<Relationship>,
}

fn is_identifier_path(s: &str) -> bool {
    !s.is_empty()
        && s.split('.').all(|seg| {
            !seg.is_empty() && seg.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

impl ResolvedFieldAddress {
    /// Dotted path below the root
    pub fn path(&self) -> String {
        self.path_segments.join(".")
    }

    /// Top-level column of the path
    pub fn column(&self) -> &str {
        self.path_segments
            .first()
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Mapped value when it is a raw SQL expression rather than a column path
    pub fn raw_expression(&self) -> Option<&str> {
        self.mapped
            .as_deref()
            .filter(|mapped| !is_identifier_path(mapped))
    }

    /// Path used to locate the value, after field mapping
    pub fn effective_path(&self) -> Vec<String> {
        match self.mapped.as_deref() {
            Some(mapped) if is_identifier_path(mapped) => {
                mapped.split('.').map(str::to_string).collect()
            }
            _ => self.path_segments.clone(),
        }
    }

    /// Whether the value lives below a top-level column
    pub fn is_nested(&self) -> bool {
        self.effective_path().len() > 1
    }
}

/// Resolves addresses against a catalog.
///
/// The primary root is the query root (SQL) or the record's root
/// (evaluation). Roots other than it are relationship crossings.
#[derive(Debug, Clone)]
pub struct FieldResolver<'a> {
    catalog: &'a SchemaCatalog,
    primary_root: Option<String>,
    extra_roots: BTreeSet<String>,
}

impl<'a> FieldResolver<'a> {
    pub fn new(catalog: &'a SchemaCatalog) -> Self {
        Self {
            catalog,
            primary_root: None,
            extra_roots: BTreeSet::new(),
        }
    }

    pub fn with_primary_root(mut self, root: impl Into<String>) -> Self {
        self.primary_root = Some(root.into());
        self
    }

    /// Roots known from context (e.g. the accessor) in addition to the catalog
    pub fn with_known_roots<I, S>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_roots.extend(roots.into_iter().map(Into::into));
        self
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        self.catalog
    }

    pub fn primary_root(&self) -> Option<&str> {
        self.primary_root.as_deref()
    }

    fn is_known_root(&self, name: &str, default_root: Option<&str>) -> bool {
        self.catalog.is_root(name)
            || self.extra_roots.contains(name)
            || self.primary_root.as_deref() == Some(name)
            || default_root == Some(name)
    }

    /// Resolve an address. `default_root` falls back to the primary root.
    pub fn resolve(
        &self,
        address: &str,
        default_root: Option<&str>,
    ) -> Result<ResolvedFieldAddress> {
        let trimmed = address.trim();
        if trimmed.is_empty() {
            return Err(CoreError::resolution(address, "field address is empty"));
        }
        let default_root = default_root.or(self.primary_root.as_deref());

        let (root, raw_segments): (Option<&str>, Vec<&str>) = if trimmed.contains(':') {
            let mut parts: Vec<&str> = trimmed.split(':').collect();
            if parts.len() > 2 && self.catalog.is_dataset(parts[0]) {
                parts.remove(0);
            }
            if parts.len() > 1 && self.is_known_root(parts[0], default_root) {
                (Some(parts[0]), parts[1..].to_vec())
            } else {
                (default_root, parts)
            }
        } else if trimmed.contains('.') {
            let parts: Vec<&str> = trimmed.split('.').collect();
            if parts.len() > 1 && self.is_known_root(parts[0], default_root) {
                (Some(parts[0]), parts[1..].to_vec())
            } else {
                (default_root, parts)
            }
        } else {
            (default_root, vec![trimmed])
        };

        let root = root.ok_or_else(|| {
            CoreError::resolution(address, "no known root in address and no default root supplied")
        })?;

        let mut path_segments = Vec::new();
        for segment in raw_segments {
            for part in segment.split('.') {
                let part = part.trim();
                if part.is_empty() {
                    return Err(CoreError::resolution(address, "empty path segment"));
                }
                path_segments.push(part.to_string());
            }
        }
        if path_segments.is_empty() {
            return Err(CoreError::resolution(address, "address names a root but no field"));
        }

        let path = path_segments.join(".");
        let mapped = [trimmed.to_string(), format!("{}.{}", root, path), path]
            .iter()
            .find_map(|key| self.catalog.mapped(key))
            .map(str::to_string);

        let (is_relationship_crossing, relationship) = match self.primary_root.as_deref() {
            Some(primary) if primary != root => {
                let edge = self
                    .catalog
                    .relationship(primary, root)
                    .cloned()
                    .unwrap_or_else(|| Relationship::conventional(primary, root));
                (true, Some(edge))
            }
            _ => (false, None),
        };

        log::trace!(
            "resolved {} -> root={} path={:?} crossing={}",
            address,
            root,
            path_segments,
            is_relationship_crossing
        );

        Ok(ResolvedFieldAddress {
            address: address.to_string(),
            root_identifier: root.to_string(),
            path_segments,
            is_relationship_crossing,
            mapped,
            relationship,
        })
    }
}
