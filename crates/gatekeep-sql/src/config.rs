//! Translator options

use serde::{Deserialize, Serialize};

/// Parameter naming scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamNaming {
    /// `param_0`, `param_1`, ... in rendering order
    #[default]
    Positional,
    /// Column-derived: `status`, `status_1`, ...
    FieldDerived,
}

/// Options that shape generated SQL without changing its meaning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorOptions {
    pub param_naming: ParamNaming,
    /// Render `or` groups of `eq` leaves on one column as a single `IN`
    pub collapse_or_equality: bool,
}

impl Default for TranslatorOptions {
    fn default() -> Self {
        Self {
            param_naming: ParamNaming::Positional,
            collapse_or_equality: true,
        }
    }
}

impl TranslatorOptions {
    pub fn with_param_naming(mut self, naming: ParamNaming) -> Self {
        self.param_naming = naming;
        self
    }

    pub fn with_collapse_or_equality(mut self, enabled: bool) -> Self {
        self.collapse_or_equality = enabled;
        self
    }
}
