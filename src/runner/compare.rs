//! Loose comparison of values read back from the page
//!
//! Form controls report numbers as strings, so `"0.30"` and `0.3` are the
//! same value here.

use serde_json::Value;
use std::collections::BTreeMap;

const EPSILON: f64 = 1e-9;

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
        }
        _ => None,
    }
}

pub fn values_match(actual: &Value, expected: &Value) -> bool {
    match (as_number(actual), as_number(expected)) {
        (Some(a), Some(b)) => (a - b).abs() < EPSILON,
        _ => actual == expected,
    }
}

/// Keys of `expected` whose value in `actual` differs, as `key: expected X, got Y`
pub fn mismatches(actual: &Value, expected: &BTreeMap<String, Value>) -> Vec<String> {
    expected
        .iter()
        .filter_map(|(key, want)| {
            let got = actual.get(key).unwrap_or(&Value::Null);
            if values_match(got, want) {
                None
            } else {
                Some(format!("{}: expected {}, got {}", key, want, got))
            }
        })
        .collect()
}

pub fn all_match(actual: &Value, expected: &BTreeMap<String, Value>) -> bool {
    expected
        .iter()
        .all(|(key, want)| values_match(actual.get(key).unwrap_or(&Value::Null), want))
}

/// Render a value for a detail line; strings are shown without quotes
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
