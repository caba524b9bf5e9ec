//! Alias-aware field access over loosely typed JSON records
//!
//! Each logical field is looked up through an ordered list of candidate keys.
//! The first key that is present with a non-null value wins, even if that value
//! then fails to convert; later aliases are not consulted in that case.

use serde_json::{Map, Value};

/// A JSON object as delivered by the list endpoint
pub type RawRecord = Map<String, Value>;

/// Returns the first present, non-null value among `keys`
pub fn first_value<'a>(record: &'a RawRecord, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find(|value| !value.is_null())
}

/// Integer field; numeric strings and integral floats are accepted
pub fn get_i64(record: &RawRecord, keys: &[&str]) -> Option<i64> {
    first_value(record, keys).and_then(value_as_i64)
}

/// Non-negative counter, defaulting to zero
pub fn get_count(record: &RawRecord, keys: &[&str]) -> u64 {
    get_i64(record, keys)
        .and_then(|n| u64::try_from(n).ok())
        .unwrap_or(0)
}

/// Text field; numbers are rendered as their decimal form
pub fn get_string(record: &RawRecord, keys: &[&str]) -> Option<String> {
    match first_value(record, keys)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Array field, empty when missing or not an array
pub fn get_array<'a>(record: &'a RawRecord, keys: &[&str]) -> &'a [Value] {
    match first_value(record, keys) {
        Some(Value::Array(items)) => items.as_slice(),
        _ => &[],
    }
}

pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RawRecord {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_first_present_alias_wins() {
        let r = record(json!({"timeStr": "今天 14:51", "time_str": "昨天 10:00"}));
        assert_eq!(
            get_string(&r, &["timeStr", "time_str"]).as_deref(),
            Some("今天 14:51")
        );
    }

    #[test]
    fn test_null_alias_falls_through() {
        let r = record(json!({"timeStr": null, "time_str": "10-31 20:56"}));
        assert_eq!(
            get_string(&r, &["timeStr", "time_str"]).as_deref(),
            Some("10-31 20:56")
        );
    }

    #[test]
    fn test_numeric_coercions() {
        let r = record(json!({"a": "42", "b": 7.0, "c": -3, "d": "x"}));
        assert_eq!(get_i64(&r, &["a"]), Some(42));
        assert_eq!(get_i64(&r, &["b"]), Some(7));
        assert_eq!(get_i64(&r, &["d"]), None);
        assert_eq!(get_count(&r, &["c"]), 0);
        assert_eq!(get_count(&r, &["missing"]), 0);
    }

    #[test]
    fn test_get_array_defaults_to_empty() {
        let r = record(json!({"list": [1, 2], "scalar": 5}));
        assert_eq!(get_array(&r, &["list"]).len(), 2);
        assert!(get_array(&r, &["scalar"]).is_empty());
        assert!(get_array(&r, &["missing"]).is_empty());
    }
}
