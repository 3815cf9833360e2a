//! Operators for condition leaves and groups

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Leaf predicate operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Operator {
    // Equality
    /// Equal (or membership when the value is a list)
    Eq,
    /// Not equal (or non-membership when the value is a list)
    Neq,

    // Ordering
    /// Less than
    Lt,
    /// Less than or equal
    Lte,
    /// Greater than
    Gt,
    /// Greater than or equal
    Gte,

    // Presence
    /// Field present and non-null
    Exists,
    /// Field absent or null
    NotExists,

    // String / array operators
    /// Substring match for strings, membership for arrays
    Contains,
    /// Negation of contains
    NotContains,
    /// String prefix
    StartsWith,
    /// String suffix
    EndsWith,

    // Membership
    /// Field value is in the supplied list
    InList,
    /// Field value is not in the supplied list
    NotInList,
    /// Array field contains the supplied scalar
    ListContains,
    /// Array field shares at least one element with the supplied list
    ListContainsAny,
}

impl Operator {
    /// Every operator, in declaration order
    pub const ALL: [Operator; 16] = [
        Operator::Eq,
        Operator::Neq,
        Operator::Lt,
        Operator::Lte,
        Operator::Gt,
        Operator::Gte,
        Operator::Exists,
        Operator::NotExists,
        Operator::Contains,
        Operator::NotContains,
        Operator::StartsWith,
        Operator::EndsWith,
        Operator::InList,
        Operator::NotInList,
        Operator::ListContains,
        Operator::ListContainsAny,
    ];

    /// Wire name of the operator
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Neq => "neq",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Exists => "exists",
            Operator::NotExists => "not_exists",
            Operator::Contains => "contains",
            Operator::NotContains => "not_contains",
            Operator::StartsWith => "starts_with",
            Operator::EndsWith => "ends_with",
            Operator::InList => "in_list",
            Operator::NotInList => "not_in_list",
            Operator::ListContains => "list_contains",
            Operator::ListContainsAny => "list_contains_any",
        }
    }

    /// Returns false only for the presence operators
    pub fn requires_value(&self) -> bool {
        !matches!(self, Operator::Exists | Operator::NotExists)
    }

    /// Returns true if the operand must be a list
    pub fn requires_list(&self) -> bool {
        matches!(
            self,
            Operator::InList | Operator::NotInList | Operator::ListContainsAny
        )
    }

    /// Returns true if this is an ordering comparison
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            Operator::Lt | Operator::Lte | Operator::Gt | Operator::Gte
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == s.trim())
            .ok_or_else(|| CoreError::UnsupportedOperator(s.to_string()))
    }
}

impl TryFrom<String> for Operator {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.as_str().to_string()
    }
}

/// Boolean combinator for condition groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupOperator {
    And,
    Or,
}

impl GroupOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupOperator::And => "and",
            GroupOperator::Or => "or",
        }
    }

    /// SQL keyword joining the children of the group
    pub fn sql_keyword(&self) -> &'static str {
        match self {
            GroupOperator::And => "AND",
            GroupOperator::Or => "OR",
        }
    }
}

impl FromStr for GroupOperator {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "and" => Ok(GroupOperator::And),
            "or" => Ok(GroupOperator::Or),
            other => Err(CoreError::UnsupportedOperator(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_round_trips_through_names() {
        for op in Operator::ALL {
            assert_eq!(op.as_str().parse::<Operator>().unwrap(), op);
        }
    }

    #[test]
    fn test_unknown_operator_is_unsupported() {
        let err = "regex".parse::<Operator>().unwrap_err();
        assert_eq!(err, CoreError::UnsupportedOperator("regex".to_string()));
    }

    #[test]
    fn test_operator_value_requirements() {
        assert!(!Operator::Exists.requires_value());
        assert!(!Operator::NotExists.requires_value());
        assert!(Operator::Eq.requires_value());
        assert!(Operator::InList.requires_list());
        assert!(Operator::ListContainsAny.requires_list());
        assert!(!Operator::ListContains.requires_list());
    }

    #[test]
    fn test_operator_serde_names() {
        let json = serde_json::to_string(&Operator::NotInList).unwrap();
        assert_eq!(json, "\"not_in_list\"");
        let op: Operator = serde_json::from_str("\"starts_with\"").unwrap();
        assert_eq!(op, Operator::StartsWith);
        assert!(serde_json::from_str::<Operator>("\"between\"").is_err());
    }

    #[test]
    fn test_group_operator_parse() {
        assert_eq!("AND".parse::<GroupOperator>().unwrap(), GroupOperator::And);
        assert_eq!(GroupOperator::Or.sql_keyword(), "OR");
        assert!("xor".parse::<GroupOperator>().is_err());
    }
}
