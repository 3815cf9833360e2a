//! Field Lookup Utilities
//!
//! Navigation of nested record values along a resolved path.

use gatekeep_core::Value;

/// Follow `path` through nested objects and arrays.
///
/// Numeric segments index into arrays. A non-numeric segment applied to an
/// array fans out over its elements and collects every hit into a list, so
/// `addresses.city` over an array of address objects yields all cities.
/// Returns `None` when nothing is found along the path.
pub(crate) fn navigate(value: &Value, path: &[String]) -> Option<Value> {
    let Some((head, rest)) = path.split_first() else {
        return Some(value.clone());
    };

    match value {
        Value::Object(map) => match map.get(head) {
            Some(child) => navigate(child, rest),
            None => {
                tracing::trace!("field '{}' not found", head);
                None
            }
        },
        Value::Array(items) => {
            if let Ok(index) = head.parse::<usize>() {
                return items.get(index).and_then(|item| navigate(item, rest));
            }
            let mut hits = Vec::new();
            for item in items {
                match navigate(item, path) {
                    Some(Value::Array(nested)) => hits.extend(nested),
                    Some(Value::Null) | None => {}
                    Some(hit) => hits.push(hit),
                }
            }
            if hits.is_empty() {
                None
            } else {
                Some(Value::Array(hits))
            }
        }
        _ => {
            tracing::trace!("cannot access '{}' on {}", head, value.type_name());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    fn record() -> Value {
        Value::from(serde_json::json!({
            "name": "Alice",
            "profile": {"age": 30, "verified": true},
            "addresses": [
                {"city": "Exampleville", "zip": "1"},
                {"city": "Otherton"}
            ],
            "tags": ["vip", "beta"]
        }))
    }

    #[test]
    fn test_navigate_simple() {
        assert_eq!(navigate(&record(), &path(&["name"])), Some(Value::from("Alice")));
    }

    #[test]
    fn test_navigate_nested() {
        assert_eq!(
            navigate(&record(), &path(&["profile", "verified"])),
            Some(Value::from(true))
        );
    }

    #[test]
    fn test_navigate_missing() {
        assert_eq!(navigate(&record(), &path(&["profile", "email"])), None);
        assert_eq!(navigate(&record(), &path(&["name", "first"])), None);
    }

    #[test]
    fn test_navigate_array_index() {
        assert_eq!(
            navigate(&record(), &path(&["addresses", "1", "city"])),
            Some(Value::from("Otherton"))
        );
        assert_eq!(navigate(&record(), &path(&["addresses", "5", "city"])), None);
    }

    #[test]
    fn test_navigate_array_fan_out() {
        assert_eq!(
            navigate(&record(), &path(&["addresses", "city"])),
            Some(Value::from(vec!["Exampleville", "Otherton"]))
        );
        assert_eq!(
            navigate(&record(), &path(&["addresses", "zip"])),
            Some(Value::from(vec!["1"]))
        );
        assert_eq!(navigate(&record(), &path(&["addresses", "country"])), None);
    }

    #[test]
    fn test_navigate_whole_array() {
        assert_eq!(
            navigate(&record(), &path(&["tags"])),
            Some(Value::from(vec!["vip", "beta"]))
        );
    }
}
