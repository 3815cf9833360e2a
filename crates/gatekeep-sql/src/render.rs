//! Parameter allocation and column rendering

use crate::config::ParamNaming;
use crate::dialect::{Dialect, NestedPath};
use crate::error::{Result, SqlError};
use gatekeep_core::ResolvedFieldAddress;
use std::collections::{BTreeSet, HashMap};

/// Names the translator never hands out for leaf values
pub(crate) const LIMIT_PARAM: &str = "limit";
pub(crate) const OFFSET_PARAM: &str = "offset";
pub(crate) const PARTITION_START_PARAM: &str = "partition_start";
pub(crate) const PARTITION_END_PARAM: &str = "partition_end";

const RESERVED: [&str; 4] = [
    LIMIT_PARAM,
    OFFSET_PARAM,
    PARTITION_START_PARAM,
    PARTITION_END_PARAM,
];

/// Hands out unique, position-derived parameter names
#[derive(Debug)]
pub(crate) struct ParamAllocator {
    naming: ParamNaming,
    next_positional: usize,
    used: BTreeSet<String>,
    indexed: HashMap<String, usize>,
}

/// Lowercase identifier-safe form of a column name
pub(crate) fn sanitize(hint: &str) -> String {
    let mut name: String = hint
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert_str(0, "p_");
    }
    name
}

impl ParamAllocator {
    pub(crate) fn new(naming: ParamNaming) -> Self {
        Self {
            naming,
            next_positional: 0,
            used: RESERVED.iter().map(|s| s.to_string()).collect(),
            indexed: HashMap::new(),
        }
    }

    fn claim(&mut self, name: String) -> String {
        self.used.insert(name.clone());
        name
    }

    /// Name for a single leaf value
    pub(crate) fn next(&mut self, column_hint: &str) -> String {
        match self.naming {
            ParamNaming::Positional => loop {
                let candidate = format!("param_{}", self.next_positional);
                self.next_positional += 1;
                if !self.used.contains(&candidate) {
                    return self.claim(candidate);
                }
            },
            ParamNaming::FieldDerived => {
                let base = sanitize(column_hint);
                if !self.used.contains(&base) {
                    return self.claim(base);
                }
                let mut suffix = 1;
                loop {
                    let candidate = format!("{}_{}", base, suffix);
                    if !self.used.contains(&candidate) {
                        return self.claim(candidate);
                    }
                    suffix += 1;
                }
            }
        }
    }

    /// `<base>_<i>` with a counter per base, continuing across calls
    pub(crate) fn indexed(&mut self, base: &str) -> String {
        let base = sanitize(base);
        loop {
            let counter = self.indexed.entry(base.clone()).or_insert(0);
            let candidate = format!("{}_{}", base, counter);
            *counter += 1;
            if !self.used.contains(&candidate) {
                return self.claim(candidate);
            }
        }
    }
}

/// Contents of a single-quoted SQL string literal
pub(crate) fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// `$.a.b` JSON path literal
pub(crate) fn json_path(keys: &[String]) -> String {
    let path: Vec<String> = keys
        .iter()
        .map(|k| {
            if k.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                k.clone()
            } else {
                format!("\"{}\"", k.replace('"', "\\\""))
            }
        })
        .collect();
    quote_literal(&format!("$.{}", path.join(".")))
}

/// Escape LIKE metacharacters with backslash
pub(crate) fn escape_like(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Render a column reference for a resolved address.
///
/// Raw mapped expressions are emitted verbatim. `qualify` prefixes the
/// table; relationship crossings are always qualified.
pub(crate) fn column_sql(
    dialect: Dialect,
    field: &ResolvedFieldAddress,
    qualify: bool,
) -> Result<String> {
    if let Some(raw) = field.raw_expression() {
        return Ok(raw.to_string());
    }

    let path = field.effective_path();
    let prefix = if qualify || field.is_relationship_crossing {
        format!("{}.", dialect.quote(&field.root_identifier)?)
    } else {
        String::new()
    };

    let Some((column, rest)) = path.split_first() else {
        return Err(SqlError::translation(format!(
            "'{}' has no column",
            field.address
        )));
    };
    let column = format!("{}{}", prefix, dialect.quote(column)?);
    if rest.is_empty() {
        return Ok(column);
    }

    Ok(match dialect.policy().nested_path {
        NestedPath::Dotted | NestedPath::BigQueryStruct | NestedPath::RedshiftSuper => {
            let mut parts = vec![column];
            for key in rest {
                parts.push(dialect.quote(key)?);
            }
            parts.join(".")
        }
        NestedPath::PostgresJson => {
            let mut expr = column;
            for (i, key) in rest.iter().enumerate() {
                let arrow = if i + 1 == rest.len() { "->>" } else { "->" };
                expr.push_str(arrow);
                expr.push_str(&quote_literal(key));
            }
            expr
        }
        NestedPath::MySqlJson => format!("{}->>{}", column, json_path(rest)),
        NestedPath::SnowflakeVariant => {
            let keys: Vec<String> = rest
                .iter()
                .map(|k| format!("\"{}\"", k.replace('"', "\"\"")))
                .collect();
            format!("{}:{}", column, keys.join("."))
        }
        NestedPath::SqlServerJsonValue => format!("JSON_VALUE({}, {})", column, json_path(rest)),
    })
}
