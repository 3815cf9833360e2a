//! Configuration types for DependencyGate

use crate::error::{Result, SdkError};
use gatekeep_core::{PartitionSpec, SchemaCatalog};
use gatekeep_sql::{partition_ranges, Dialect, TranslatorOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Gate configuration
///
/// ```yaml
/// dialect: postgres
/// default_root: manual_task_instance
/// catalog:
///   roots: [manual_task_instance, manual_task]
///   field_mapping:
///     verified: "(user_data->'profile'->>'verified')::boolean"
/// options:
///   param_naming: positional
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// SQL dialect for compiled queries
    pub dialect: Dialect,

    /// Roots, relationships, field mapping and partitioning
    pub catalog: SchemaCatalog,

    /// SQL rendering options
    pub options: TranslatorOptions,

    /// Root used when an address or call names none
    pub default_root: Option<String>,
}

impl GateConfig {
    /// Create a configuration with defaults (generic dialect, empty catalog)
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: GateConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        tracing::debug!("loading gate config from {}", path.display());
        Self::from_yaml_str(&content)
    }

    /// Set the dialect
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Set the schema catalog
    pub fn with_catalog(mut self, catalog: SchemaCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Set translator options
    pub fn with_options(mut self, options: TranslatorOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the default root
    pub fn with_default_root(mut self, root: impl Into<String>) -> Self {
        self.default_root = Some(root.into());
        self
    }

    /// Reject settings that would only fail later, at query time
    pub fn validate(&self) -> Result<()> {
        if let Some(root) = &self.default_root {
            if root.trim().is_empty() {
                return Err(SdkError::ConfigError("default_root is empty".to_string()));
            }
        }

        for (root, spec) in &self.catalog.partitioning {
            match spec {
                PartitionSpec::TimeBased {
                    field,
                    start,
                    end,
                    interval,
                } => {
                    if field.trim().is_empty() {
                        return Err(SdkError::ConfigError(format!(
                            "partition field for {} is empty",
                            root
                        )));
                    }
                    partition_ranges(start, end, interval).map_err(|e| {
                        SdkError::ConfigError(format!("partitioning for {}: {}", root, e))
                    })?;
                }
                PartitionSpec::WhereClauses(clauses) if clauses.is_empty() => {
                    return Err(SdkError::ConfigError(format!(
                        "partitioning for {} has no clauses",
                        root
                    )));
                }
                PartitionSpec::WhereClauses(_) => {}
            }
        }
        Ok(())
    }
}
