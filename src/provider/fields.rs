//! Ordered fallback field accessors for loosely-shaped provider JSON
//!
//! Providers rename fields between API versions and mix numbers with
//! numeric strings. Each field the clients read is declared once as an
//! ordered list of candidate paths; the first candidate that yields a
//! usable value wins.

use serde_json::Value;

/// Dotted path into a JSON object, e.g. `"mintA.address"`
pub type FieldPath = &'static str;

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, key| current.get(key))
        .filter(|v| !v.is_null())
}

/// Number or numeric string
fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|f| f.is_finite())
}

/// First candidate that parses as a finite number
pub fn first_f64(value: &Value, candidates: &[FieldPath]) -> Option<f64> {
    candidates
        .iter()
        .find_map(|path| lookup(value, path).and_then(as_f64))
}

/// First candidate that is a non-negative integer (or integral numeric string)
pub fn first_u64(value: &Value, candidates: &[FieldPath]) -> Option<u64> {
    candidates.iter().find_map(|path| {
        lookup(value, path).and_then(|v| match v {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        })
    })
}

/// First candidate that is a non-empty string
pub fn first_str(value: &Value, candidates: &[FieldPath]) -> Option<String> {
    candidates.iter().find_map(|path| {
        lookup(value, path)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

/// First candidate that is a JSON array
///
/// The empty path `""` means "the value itself", for bare-array bodies.
pub fn first_array<'a>(value: &'a Value, candidates: &[FieldPath]) -> Option<&'a Vec<Value>> {
    candidates.iter().find_map(|path| {
        if path.is_empty() {
            value.as_array()
        } else {
            lookup(value, path).and_then(Value::as_array)
        }
    })
}
