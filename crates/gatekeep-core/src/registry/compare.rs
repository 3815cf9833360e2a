//! In-memory comparison functions
//!
//! Each function receives a present, non-null field value. Presence itself is
//! handled by `OperatorEntry::compare` before these are reached.

use crate::types::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::cmp::Ordering;
use thiserror::Error;

/// Operands that cannot be compared with the requested operator.
///
/// Not fatal: the evaluator turns it into `false` and logs it.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("type mismatch: {0}")]
pub struct TypeMismatch(pub String);

pub(crate) type CompareResult = std::result::Result<bool, TypeMismatch>;

fn mismatch(op: &str, actual: &Value, expected: &Value) -> TypeMismatch {
    TypeMismatch(format!(
        "cannot apply {} to {} and {}",
        op,
        actual.type_name(),
        expected.type_name()
    ))
}

fn require<'a>(op: &str, expected: Option<&'a Value>) -> Result<&'a Value, TypeMismatch> {
    expected.ok_or_else(|| TypeMismatch(format!("{} requires an operand", op)))
}

/// Parse an ISO-8601 datetime or date string
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Type-aware equality. Strings that both parse as datetimes compare as instants.
fn scalar_eq(actual: &Value, expected: &Value) -> CompareResult {
    match (actual, expected) {
        (Value::Number(l), Value::Number(r)) => Ok(l == r),
        (Value::Bool(l), Value::Bool(r)) => Ok(l == r),
        (Value::String(l), Value::String(r)) => {
            if l == r {
                return Ok(true);
            }
            match (parse_datetime(l), parse_datetime(r)) {
                (Some(l), Some(r)) => Ok(l == r),
                _ => Ok(false),
            }
        }
        _ => Err(mismatch("eq", actual, expected)),
    }
}

fn ordering(actual: &Value, expected: &Value) -> Result<Ordering, TypeMismatch> {
    match (actual, expected) {
        (Value::Number(l), Value::Number(r)) => l
            .partial_cmp(r)
            .ok_or_else(|| mismatch("ordering", actual, expected)),
        (Value::String(l), Value::String(r)) => match (parse_datetime(l), parse_datetime(r)) {
            (Some(l), Some(r)) => Ok(l.cmp(&r)),
            _ => Ok(l.cmp(r)),
        },
        _ => Err(mismatch("ordering", actual, expected)),
    }
}

/// Membership of a scalar in a list, skipping incomparable members
fn member_of(actual: &Value, items: &[Value]) -> bool {
    items
        .iter()
        .any(|item| scalar_eq(actual, item).unwrap_or(false))
}

pub(crate) fn eq(actual: &Value, expected: Option<&Value>) -> CompareResult {
    let expected = require("eq", expected)?;
    match expected {
        Value::Array(items) if actual.is_scalar() => Ok(member_of(actual, items)),
        Value::Array(_) => Err(mismatch("eq", actual, expected)),
        _ => scalar_eq(actual, expected),
    }
}

pub(crate) fn neq(actual: &Value, expected: Option<&Value>) -> CompareResult {
    eq(actual, expected).map(|matched| !matched)
}

pub(crate) fn lt(actual: &Value, expected: Option<&Value>) -> CompareResult {
    Ok(ordering(actual, require("lt", expected)?)? == Ordering::Less)
}

pub(crate) fn lte(actual: &Value, expected: Option<&Value>) -> CompareResult {
    Ok(ordering(actual, require("lte", expected)?)? != Ordering::Greater)
}

pub(crate) fn gt(actual: &Value, expected: Option<&Value>) -> CompareResult {
    Ok(ordering(actual, require("gt", expected)?)? == Ordering::Greater)
}

pub(crate) fn gte(actual: &Value, expected: Option<&Value>) -> CompareResult {
    Ok(ordering(actual, require("gte", expected)?)? != Ordering::Less)
}

pub(crate) fn exists(_actual: &Value, _expected: Option<&Value>) -> CompareResult {
    Ok(true)
}

pub(crate) fn not_exists(_actual: &Value, _expected: Option<&Value>) -> CompareResult {
    Ok(false)
}

pub(crate) fn contains(actual: &Value, expected: Option<&Value>) -> CompareResult {
    let expected = require("contains", expected)?;
    match (actual, expected) {
        (Value::Array(items), needle) if needle.is_scalar() => Ok(member_of(needle, items)),
        // numbers and bools match as their text, the same as a LIKE pattern
        (Value::String(haystack), needle) => match needle.as_text() {
            Some(text) => Ok(haystack.contains(text.as_str())),
            None => Err(mismatch("contains", actual, expected)),
        },
        _ => Err(mismatch("contains", actual, expected)),
    }
}

pub(crate) fn not_contains(actual: &Value, expected: Option<&Value>) -> CompareResult {
    contains(actual, expected).map(|matched| !matched)
}

pub(crate) fn starts_with(actual: &Value, expected: Option<&Value>) -> CompareResult {
    let expected = require("starts_with", expected)?;
    match (actual, expected) {
        (Value::String(s), prefix) => match prefix.as_text() {
            Some(text) => Ok(s.starts_with(text.as_str())),
            None => Err(mismatch("starts_with", actual, expected)),
        },
        _ => Err(mismatch("starts_with", actual, expected)),
    }
}

pub(crate) fn ends_with(actual: &Value, expected: Option<&Value>) -> CompareResult {
    let expected = require("ends_with", expected)?;
    match (actual, expected) {
        (Value::String(s), suffix) => match suffix.as_text() {
            Some(text) => Ok(s.ends_with(text.as_str())),
            None => Err(mismatch("ends_with", actual, expected)),
        },
        _ => Err(mismatch("ends_with", actual, expected)),
    }
}

pub(crate) fn in_list(actual: &Value, expected: Option<&Value>) -> CompareResult {
    let expected = require("in_list", expected)?;
    match expected {
        Value::Array(items) if actual.is_scalar() => Ok(member_of(actual, items)),
        _ => Err(mismatch("in_list", actual, expected)),
    }
}

pub(crate) fn not_in_list(actual: &Value, expected: Option<&Value>) -> CompareResult {
    in_list(actual, expected).map(|matched| !matched)
}

pub(crate) fn list_contains(actual: &Value, expected: Option<&Value>) -> CompareResult {
    let expected = require("list_contains", expected)?;
    match actual {
        Value::Array(items) if expected.is_scalar() => Ok(member_of(expected, items)),
        _ => Err(mismatch("list_contains", actual, expected)),
    }
}

pub(crate) fn list_contains_any(actual: &Value, expected: Option<&Value>) -> CompareResult {
    let expected = require("list_contains_any", expected)?;
    match (actual, expected) {
        (Value::Array(items), Value::Array(wanted)) => {
            Ok(wanted.iter().any(|w| member_of(w, items)))
        }
        _ => Err(mismatch("list_contains_any", actual, expected)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Value {
        Value::from(v)
    }

    #[test]
    fn test_eq_type_aware() {
        assert_eq!(eq(&Value::from(5), Some(&Value::from(5.0))), Ok(true));
        assert_eq!(eq(&s("a"), Some(&s("b"))), Ok(false));
        assert!(eq(&Value::from(5), Some(&s("5"))).is_err());
    }

    #[test]
    fn test_eq_datetimes_compare_as_instants() {
        assert_eq!(
            eq(&s("2024-01-01T00:00:00Z"), Some(&s("2024-01-01T00:00:00+00:00"))),
            Ok(true)
        );
    }

    #[test]
    fn test_eq_with_list_is_membership() {
        let list = Value::from(vec!["approved", "complete"]);
        assert_eq!(eq(&s("complete"), Some(&list)), Ok(true));
        assert_eq!(eq(&s("pending"), Some(&list)), Ok(false));
        assert_eq!(neq(&s("pending"), Some(&list)), Ok(true));
    }

    #[test]
    fn test_ordering_numbers_and_dates() {
        assert_eq!(gt(&Value::from(5), Some(&Value::from(0))), Ok(true));
        assert_eq!(lte(&Value::from(5), Some(&Value::from(5))), Ok(true));
        assert_eq!(lt(&s("2024-01-01"), Some(&s("2024-01-02T10:00:00Z"))), Ok(true));
        assert_eq!(gte(&s("2023-12-31T23:59:59Z"), Some(&s("2024-01-01"))), Ok(false));
    }

    #[test]
    fn test_ordering_mismatch() {
        assert!(gt(&s("abc"), Some(&Value::from(1))).is_err());
        assert!(gt(&Value::from(true), Some(&Value::from(1))).is_err());
    }

    #[test]
    fn test_contains_strings_and_arrays() {
        assert_eq!(contains(&s("customer-1@example.com"), Some(&s("@example"))), Ok(true));
        assert_eq!(contains(&s("Example"), Some(&s("example"))), Ok(false));
        let tags = Value::from(vec!["vip", "beta"]);
        assert_eq!(contains(&tags, Some(&s("beta"))), Ok(true));
        assert_eq!(not_contains(&tags, Some(&s("alpha"))), Ok(true));
    }

    #[test]
    fn test_contains_number_in_string_matches_text() {
        assert_eq!(contains(&s("a5b"), Some(&Value::from(5))), Ok(true));
        assert_eq!(contains(&s("abc"), Some(&Value::from(5))), Ok(false));
        assert!(contains(&Value::from(15), Some(&Value::from(5))).is_err());
    }

    #[test]
    fn test_prefix_suffix() {
        assert_eq!(starts_with(&s("customer-1@example.com"), Some(&s("customer-1"))), Ok(true));
        assert_eq!(ends_with(&s("customer-1@example.com"), Some(&s(".org"))), Ok(false));
        assert!(starts_with(&Value::from(10), Some(&s("1"))).is_err());
        assert_eq!(starts_with(&s("10-a"), Some(&Value::from(10))), Ok(true));
    }

    #[test]
    fn test_list_operators() {
        let users = Value::from(vec!["u1", "u2"]);
        assert_eq!(list_contains(&users, Some(&s("u2"))), Ok(true));
        assert_eq!(list_contains_any(&users, Some(&Value::from(vec!["u3", "u1"]))), Ok(true));
        assert_eq!(list_contains_any(&users, Some(&Value::from(vec!["u3"]))), Ok(false));
        assert!(list_contains(&s("u1"), Some(&s("u1"))).is_err());
    }

    #[test]
    fn test_in_list() {
        let list = Value::from(vec![1, 2, 3]);
        assert_eq!(in_list(&Value::from(2), Some(&list)), Ok(true));
        assert_eq!(not_in_list(&Value::from(4), Some(&list)), Ok(true));
        assert!(in_list(&Value::from(2), Some(&Value::from(2))).is_err());
    }

    #[test]
    fn test_parse_datetime_formats() {
        assert!(parse_datetime("2024-03-01").is_some());
        assert!(parse_datetime("2024-03-01 12:30:00").is_some());
        assert!(parse_datetime("2024-03-01T12:30:00.250").is_some());
        assert!(parse_datetime("2024-03-01T12:30:00+02:00").is_some());
        assert!(parse_datetime("yesterday").is_none());
    }
}
