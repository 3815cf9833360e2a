//! Partitioned statement generation
//!
//! Collections with a [`PartitionSpec`] on a partitioning dialect get one
//! statement per partition instead of one statement for the whole table.
//! Time ranges are half-open `[start, end)` except the last, which also
//! includes the upper bound, so together they cover the configured span
//! exactly once.

use crate::error::{Result, SqlError};
use crate::query::CompiledQuery;
use crate::render::{PARTITION_END_PARAM, PARTITION_START_PARAM};
use crate::statement::UpdateStatement;
use crate::translator::{SelectOptions, SqlTranslator};
use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};
use gatekeep_core::{ConditionNode, PartitionSpec, Value};
use std::collections::BTreeMap;

/// One time bucket of a partitioned collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Whether `end` belongs to this range (last range only)
    pub end_inclusive: bool,
}

/// Restriction ANDed onto a statement for one partition
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PartitionClause {
    pub(crate) sql: String,
    pub(crate) parameters: BTreeMap<String, Value>,
}

/// Parse `"<n> <UNIT>"` (an optional leading `INTERVAL` is accepted)
pub fn parse_interval(text: &str) -> Result<Duration> {
    let mut parts: Vec<&str> = text.split_whitespace().collect();
    if parts.first().is_some_and(|p| p.eq_ignore_ascii_case("interval")) {
        parts.remove(0);
    }
    let [amount, unit] = parts.as_slice() else {
        return Err(SqlError::partition(format!("malformed interval '{}'", text)));
    };

    let amount: i64 = amount
        .parse()
        .map_err(|_| SqlError::partition(format!("malformed interval amount '{}'", amount)))?;
    if amount <= 0 {
        return Err(SqlError::partition(format!(
            "interval must be positive, got '{}'",
            text
        )));
    }

    let unit = unit.to_ascii_uppercase();
    let seconds_per_unit: i64 = match unit.trim_end_matches('S') {
        "SECOND" => 1,
        "MINUTE" => 60,
        "HOUR" => 3_600,
        "DAY" => 86_400,
        "WEEK" => 604_800,
        _ => {
            return Err(SqlError::partition(format!(
                "unknown interval unit '{}'",
                unit
            )))
        }
    };

    amount
        .checked_mul(seconds_per_unit)
        .and_then(Duration::try_seconds)
        .ok_or_else(|| SqlError::partition(format!("interval '{}' is out of range", text)))
}

fn parse_bound(text: &str) -> Result<DateTime<Utc>> {
    gatekeep_core::parse_datetime(text)
        .ok_or_else(|| SqlError::partition(format!("unparseable partition bound '{}'", text)))
}

fn is_date_only(text: &str) -> bool {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").is_ok()
}

/// Split `[start, end]` into consecutive ranges of at most `interval`
pub fn partition_ranges(start: &str, end: &str, interval: &str) -> Result<Vec<PartitionRange>> {
    let lo = parse_bound(start)?;
    let hi = parse_bound(end)?;
    let step = parse_interval(interval)?;
    if hi < lo {
        return Err(SqlError::partition(format!(
            "partition end '{}' is before start '{}'",
            end, start
        )));
    }
    if hi == lo {
        return Ok(vec![PartitionRange {
            start: lo,
            end: hi,
            end_inclusive: true,
        }]);
    }

    let mut ranges = Vec::new();
    let mut cursor = lo;
    while cursor < hi {
        let next = cursor
            .checked_add_signed(step)
            .map_or(hi, |candidate| candidate.min(hi));
        ranges.push(PartitionRange {
            start: cursor,
            end: next,
            end_inclusive: next == hi,
        });
        cursor = next;
    }
    Ok(ranges)
}

/// Partition restrictions for `column`; `column` is already rendered SQL
pub(crate) fn partition_clauses(
    translator: &SqlTranslator,
    spec: &PartitionSpec,
    column: &str,
) -> Result<Vec<PartitionClause>> {
    match spec {
        PartitionSpec::TimeBased {
            start,
            end,
            interval,
            ..
        } => {
            let whole_days = parse_interval(interval)?.num_seconds() % 86_400 == 0;
            let date_only = whole_days && is_date_only(start) && is_date_only(end);
            let format = |t: &DateTime<Utc>| {
                if date_only {
                    t.format("%Y-%m-%d").to_string()
                } else {
                    t.to_rfc3339_opts(SecondsFormat::Secs, true)
                }
            };

            let dialect = translator.dialect();
            let start_ph = dialect.placeholder(PARTITION_START_PARAM);
            let end_ph = dialect.placeholder(PARTITION_END_PARAM);
            Ok(partition_ranges(start, end, interval)?
                .into_iter()
                .map(|range| {
                    let upper = if range.end_inclusive { "<=" } else { "<" };
                    let mut parameters = BTreeMap::new();
                    parameters.insert(
                        PARTITION_START_PARAM.to_string(),
                        Value::String(format(&range.start)),
                    );
                    parameters.insert(
                        PARTITION_END_PARAM.to_string(),
                        Value::String(format(&range.end)),
                    );
                    PartitionClause {
                        sql: format!(
                            "{} >= {} AND {} {} {}",
                            column, start_ph, column, upper, end_ph
                        ),
                        parameters,
                    }
                })
                .collect())
        }
        PartitionSpec::WhereClauses(clauses) => {
            if clauses.is_empty() {
                return Err(SqlError::partition("partition clause list is empty"));
            }
            Ok(clauses
                .iter()
                .map(|clause| PartitionClause {
                    sql: clause.clone(),
                    parameters: BTreeMap::new(),
                })
                .collect())
        }
    }
}

/// `(base) AND (partition)`, or `base` when there is no partition
pub(crate) fn restrict(
    where_sql: &str,
    parameters: &BTreeMap<String, Value>,
    clause: Option<&PartitionClause>,
) -> (String, BTreeMap<String, Value>) {
    match clause {
        None => (where_sql.to_string(), parameters.clone()),
        Some(clause) => {
            let mut merged = parameters.clone();
            merged.extend(clause.parameters.clone());
            (format!("({}) AND ({})", where_sql, clause.sql), merged)
        }
    }
}

impl SqlTranslator {
    /// Clauses for `root`, or `None` when it is not partitioned under this dialect
    pub(crate) fn partitions_for(
        &self,
        root: &str,
        qualify: bool,
    ) -> Result<Option<Vec<PartitionClause>>> {
        if !self.dialect().policy().partitioning {
            return Ok(None);
        }
        let Some(spec) = self.catalog().partition(root) else {
            return Ok(None);
        };

        let column = match spec {
            PartitionSpec::TimeBased { field, .. } => {
                let column = self.dialect().quote(field)?;
                if qualify {
                    format!("{}.{}", self.dialect().quote(root)?, column)
                } else {
                    column
                }
            }
            PartitionSpec::WhereClauses(_) => String::new(),
        };
        let clauses = partition_clauses(self, spec, &column)?;
        tracing::debug!("{} partitions for {}", clauses.len(), root);
        Ok(Some(clauses))
    }

    /// One SELECT per partition of `primary_root`
    pub fn partitioned_select_queries(
        &self,
        condition: &ConditionNode,
        primary_root: &str,
        options: &SelectOptions,
    ) -> Result<Vec<CompiledQuery>> {
        let lowered = self.lower(condition, primary_root, &options.fields)?;
        match self.partitions_for(primary_root, lowered.qualify)? {
            None => Ok(vec![self.assemble_select(
                primary_root,
                &lowered,
                lowered.where_sql.clone(),
                lowered.parameters.clone(),
                options,
            )?]),
            Some(clauses) => clauses
                .iter()
                .map(|clause| {
                    let (where_sql, parameters) =
                        restrict(&lowered.where_sql, &lowered.parameters, Some(clause));
                    self.assemble_select(primary_root, &lowered, where_sql, parameters, options)
                })
                .collect(),
        }
    }

    /// One UPDATE per partition of `table`
    pub fn partitioned_update_stmts(
        &self,
        table: &str,
        values: &BTreeMap<String, Value>,
        locator: &ConditionNode,
    ) -> Result<Vec<UpdateStatement>> {
        let parts = self.update_parts(table, values, locator)?;
        match self.partitions_for(table, false)? {
            None => Ok(vec![parts.finish(None)]),
            Some(clauses) => Ok(clauses.iter().map(|c| parts.finish(Some(c))).collect()),
        }
    }

    /// One DELETE per partition of `table`
    pub fn partitioned_delete_stmts(
        &self,
        table: &str,
        locator: &ConditionNode,
    ) -> Result<Vec<CompiledQuery>> {
        let parts = self.delete_parts(table, locator)?;
        match self.partitions_for(table, false)? {
            None => Ok(vec![parts.finish(None)]),
            Some(clauses) => Ok(clauses.iter().map(|c| parts.finish(Some(c))).collect()),
        }
    }
}
