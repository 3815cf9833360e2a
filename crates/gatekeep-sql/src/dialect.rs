//! SQL dialects
//!
//! Every per-engine difference lives in one static policy table indexed by
//! [`Dialect`]. The translator consults the table and never branches on the
//! dialect itself.

use crate::error::{Result, SqlError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target database engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Dialect {
    #[default]
    Generic,
    Postgres,
    MySql,
    Snowflake,
    Redshift,
    BigQuery,
    SqlServer,
    GoogleCloudPostgres,
}

/// Identifier quoting rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quoting {
    /// Bare identifiers; anything outside `[A-Za-z_][A-Za-z0-9_$]*` is rejected
    None,
    DoubleQuote,
    Backtick,
    Bracket,
}

/// How a multi-value `IN` binds its values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InStyle {
    /// One parameter holding the whole list
    Tuple,
    /// One placeholder per value, `<column>_in_stmt_generated_<i>`
    Distinct,
}

/// Placeholder syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// `:name`
    Colon,
    /// `@name`
    At,
}

/// Array membership / overlap form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayStyle {
    /// `col @> ARRAY[:p]`, `col && :p`
    PostgresArray,
    /// `JSON_CONTAINS` / `JSON_OVERLAPS` over JSON arrays
    MySqlJson,
    /// `EXISTS (SELECT 1 FROM UNNEST(col) ...)`
    BigQueryUnnest,
    /// `ARRAY_CONTAINS` / `ARRAYS_OVERLAP`
    SnowflakeArray,
    /// `EXISTS (SELECT 1 FROM OPENJSON(col) ...)`
    SqlServerOpenJson,
    /// No array operators
    Unsupported,
}

/// Nested field access form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestedPath {
    /// `col.a.b`
    Dotted,
    /// `"col"->'a'->>'b'`
    PostgresJson,
    /// `` `col`->>'$.a.b' ``
    MySqlJson,
    /// `` `col`.`a`.`b` ``
    BigQueryStruct,
    /// `"col":"a"."b"`
    SnowflakeVariant,
    /// `JSON_VALUE([col], '$.a.b')`
    SqlServerJsonValue,
    /// `"col"."a"."b"` over SUPER
    RedshiftSuper,
}

/// How a nested field is assigned in UPDATE statements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestedUpdate {
    PostgresJsonbSet,
    MySqlJsonSet,
    SqlServerJsonModify,
    /// Read the current struct, patch it, write the whole struct back
    StructReplace,
}

/// Pagination clause form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    /// `LIMIT :limit OFFSET :offset`
    LimitOffset,
    /// `ORDER BY (SELECT NULL) OFFSET :offset ROWS FETCH NEXT :limit ROWS ONLY`
    OffsetFetch,
}

/// Policy row of the dialect table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectPolicy {
    pub name: &'static str,
    pub quoting: Quoting,
    pub in_style: InStyle,
    pub placeholder: Placeholder,
    pub arrays: ArrayStyle,
    pub nested_path: NestedPath,
    pub nested_update: NestedUpdate,
    pub pagination: Pagination,
    /// Backslash as written inside the `ESCAPE '...'` literal; `None` when
    /// backslash is already the engine's LIKE escape
    pub like_escape: Option<&'static str>,
    /// Updates that set NULL go through the driver's update builder
    pub structured_null_updates: bool,
    /// Partition specs replicate statements per partition
    pub partitioning: bool,
}

const POSTGRES: DialectPolicy = DialectPolicy {
    name: "postgres",
    quoting: Quoting::DoubleQuote,
    in_style: InStyle::Tuple,
    placeholder: Placeholder::Colon,
    arrays: ArrayStyle::PostgresArray,
    nested_path: NestedPath::PostgresJson,
    nested_update: NestedUpdate::PostgresJsonbSet,
    pagination: Pagination::LimitOffset,
    like_escape: None,
    structured_null_updates: false,
    partitioning: false,
};

/// Indexed by `Dialect as usize`
const POLICIES: [DialectPolicy; 8] = [
    DialectPolicy {
        name: "generic",
        quoting: Quoting::None,
        in_style: InStyle::Tuple,
        placeholder: Placeholder::Colon,
        arrays: ArrayStyle::PostgresArray,
        nested_path: NestedPath::Dotted,
        nested_update: NestedUpdate::StructReplace,
        pagination: Pagination::LimitOffset,
        like_escape: Some("\\"),
        structured_null_updates: false,
        partitioning: false,
    },
    POSTGRES,
    DialectPolicy {
        name: "mysql",
        quoting: Quoting::Backtick,
        in_style: InStyle::Tuple,
        placeholder: Placeholder::Colon,
        arrays: ArrayStyle::MySqlJson,
        nested_path: NestedPath::MySqlJson,
        nested_update: NestedUpdate::MySqlJsonSet,
        pagination: Pagination::LimitOffset,
        like_escape: None,
        structured_null_updates: false,
        partitioning: false,
    },
    DialectPolicy {
        name: "snowflake",
        quoting: Quoting::DoubleQuote,
        in_style: InStyle::Distinct,
        placeholder: Placeholder::Colon,
        arrays: ArrayStyle::SnowflakeArray,
        nested_path: NestedPath::SnowflakeVariant,
        nested_update: NestedUpdate::StructReplace,
        pagination: Pagination::LimitOffset,
        // string literals treat backslash as an escape, so it is doubled
        like_escape: Some("\\\\"),
        structured_null_updates: false,
        partitioning: false,
    },
    DialectPolicy {
        name: "redshift",
        quoting: Quoting::DoubleQuote,
        in_style: InStyle::Tuple,
        placeholder: Placeholder::Colon,
        arrays: ArrayStyle::Unsupported,
        nested_path: NestedPath::RedshiftSuper,
        nested_update: NestedUpdate::StructReplace,
        pagination: Pagination::LimitOffset,
        like_escape: None,
        structured_null_updates: false,
        partitioning: false,
    },
    DialectPolicy {
        name: "bigquery",
        quoting: Quoting::Backtick,
        in_style: InStyle::Distinct,
        placeholder: Placeholder::At,
        arrays: ArrayStyle::BigQueryUnnest,
        nested_path: NestedPath::BigQueryStruct,
        nested_update: NestedUpdate::StructReplace,
        pagination: Pagination::LimitOffset,
        like_escape: None,
        structured_null_updates: true,
        partitioning: true,
    },
    DialectPolicy {
        name: "sqlserver",
        quoting: Quoting::Bracket,
        in_style: InStyle::Distinct,
        placeholder: Placeholder::Colon,
        arrays: ArrayStyle::SqlServerOpenJson,
        nested_path: NestedPath::SqlServerJsonValue,
        nested_update: NestedUpdate::SqlServerJsonModify,
        pagination: Pagination::OffsetFetch,
        like_escape: Some("\\"),
        structured_null_updates: false,
        partitioning: false,
    },
    DialectPolicy {
        name: "google_cloud_postgres",
        ..POSTGRES
    },
];

impl Dialect {
    pub const ALL: [Dialect; 8] = [
        Dialect::Generic,
        Dialect::Postgres,
        Dialect::MySql,
        Dialect::Snowflake,
        Dialect::Redshift,
        Dialect::BigQuery,
        Dialect::SqlServer,
        Dialect::GoogleCloudPostgres,
    ];

    /// The policy row for this dialect
    pub fn policy(&self) -> &'static DialectPolicy {
        &POLICIES[*self as usize]
    }

    pub fn as_str(&self) -> &'static str {
        self.policy().name
    }

    /// Quote one identifier
    pub fn quote(&self, ident: &str) -> Result<String> {
        if ident.is_empty() {
            return Err(SqlError::translation("empty identifier"));
        }
        Ok(match self.policy().quoting {
            Quoting::None => {
                let mut chars = ident.chars();
                let valid_start = chars
                    .next()
                    .map(|c| c.is_ascii_alphabetic() || c == '_')
                    .unwrap_or(false);
                if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
                {
                    return Err(SqlError::translation(format!(
                        "identifier '{}' cannot be used unquoted",
                        ident
                    )));
                }
                ident.to_string()
            }
            Quoting::DoubleQuote => format!("\"{}\"", ident.replace('"', "\"\"")),
            Quoting::Backtick => format!("`{}`", ident.replace('`', "``")),
            Quoting::Bracket => format!("[{}]", ident.replace(']', "]]")),
        })
    }

    /// Placeholder text for a parameter name
    pub fn placeholder(&self, name: &str) -> String {
        match self.policy().placeholder {
            Placeholder::Colon => format!(":{}", name),
            Placeholder::At => format!("@{}", name),
        }
    }

    /// ` ESCAPE '<c>'` suffix for LIKE, empty when the engine default is used
    pub fn like_escape_clause(&self) -> String {
        self.policy()
            .like_escape
            .map(|c| format!(" ESCAPE '{}'", c))
            .unwrap_or_default()
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = SqlError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "postgresql" => return Ok(Dialect::Postgres),
            "mssql" | "sql_server" => return Ok(Dialect::SqlServer),
            "google_cloud_sql_postgres" => return Ok(Dialect::GoogleCloudPostgres),
            _ => {}
        }
        Dialect::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == normalized)
            .ok_or_else(|| SqlError::UnknownDialect(s.to_string()))
    }
}

impl TryFrom<String> for Dialect {
    type Error = SqlError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Dialect> for String {
    fn from(dialect: Dialect) -> Self {
        dialect.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_order_matches_enum() {
        for dialect in Dialect::ALL {
            assert_eq!(dialect.as_str().parse::<Dialect>().unwrap(), dialect);
        }
    }

    #[test]
    fn test_quoting_rules() {
        assert_eq!(Dialect::Generic.quote("email").unwrap(), "email");
        assert_eq!(Dialect::Postgres.quote("email").unwrap(), "\"email\"");
        assert_eq!(Dialect::MySql.quote("email").unwrap(), "`email`");
        assert_eq!(Dialect::BigQuery.quote("email").unwrap(), "`email`");
        assert_eq!(Dialect::SqlServer.quote("email").unwrap(), "[email]");
        assert_eq!(Dialect::Snowflake.quote("email").unwrap(), "\"email\"");
        assert_eq!(Dialect::Redshift.quote("email").unwrap(), "\"email\"");
    }

    #[test]
    fn test_quoting_escapes_delimiters() {
        assert_eq!(Dialect::Postgres.quote("a\"b").unwrap(), "\"a\"\"b\"");
        assert_eq!(Dialect::MySql.quote("a`b").unwrap(), "`a``b`");
        assert_eq!(Dialect::SqlServer.quote("a]b").unwrap(), "[a]]b]");
    }

    #[test]
    fn test_generic_rejects_unsafe_identifiers() {
        assert!(Dialect::Generic.quote("email; DROP TABLE x").is_err());
        assert!(Dialect::Generic.quote("1col").is_err());
        assert!(Dialect::Generic.quote("").is_err());
    }

    #[test]
    fn test_in_style_policy() {
        assert_eq!(Dialect::Postgres.policy().in_style, InStyle::Tuple);
        assert_eq!(Dialect::GoogleCloudPostgres.policy().in_style, InStyle::Tuple);
        assert_eq!(Dialect::SqlServer.policy().in_style, InStyle::Distinct);
        assert_eq!(Dialect::BigQuery.policy().in_style, InStyle::Distinct);
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(Dialect::Postgres.placeholder("param_0"), ":param_0");
        assert_eq!(Dialect::BigQuery.placeholder("param_0"), "@param_0");
    }

    #[test]
    fn test_parse_aliases_and_serde() {
        assert_eq!("PostgreSQL".parse::<Dialect>().unwrap(), Dialect::Postgres);
        assert_eq!("mssql".parse::<Dialect>().unwrap(), Dialect::SqlServer);
        assert!("oracle".parse::<Dialect>().is_err());
        let json = serde_json::to_string(&Dialect::BigQuery).unwrap();
        assert_eq!(json, "\"bigquery\"");
    }

    #[test]
    fn test_like_escape_clause() {
        assert_eq!(Dialect::SqlServer.like_escape_clause(), " ESCAPE '\\'");
        assert_eq!(Dialect::Postgres.like_escape_clause(), "");
        assert_eq!(Dialect::Snowflake.like_escape_clause(), " ESCAPE '\\\\'");
    }
}
