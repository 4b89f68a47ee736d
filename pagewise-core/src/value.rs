//! Ordering and property lookup over JSON record views.
//!
//! In-memory loaders evaluate filters and sort clauses against a
//! `serde_json::Value` view of each record. This module defines how those
//! values are addressed and compared.

use serde_json::{Number, Value};
use std::cmp::Ordering;

/// Look up a property on a JSON object. Dotted paths (`address.city`) walk
/// nested objects. Missing segments yield `None`.
pub fn property<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(record, |current, segment| current.as_object()?.get(segment))
}

/// Compare two values of the same kind.
///
/// Returns `None` for nulls, arrays, objects, and mismatched kinds.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Total order used for sorting: null first, then by kind, then by value.
pub fn sort_order(a: &Value, b: &Value) -> Ordering {
    kind_rank(a)
        .cmp(&kind_rank(b))
        .then_with(|| compare_values(a, b).unwrap_or(Ordering::Equal))
}

fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_numbers(x: &Number, y: &Number) -> Option<Ordering> {
    match (as_integer(x), as_integer(y)) {
        (Some(a), Some(b)) => Some(a.cmp(&b)),
        (Some(a), None) => compare_integer_float(a, y.as_f64()?),
        (None, Some(b)) => compare_integer_float(b, x.as_f64()?).map(Ordering::reverse),
        (None, None) => x.as_f64()?.partial_cmp(&y.as_f64()?),
    }
}

fn as_integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

/// Exact comparison of an integer with a float, without rounding the integer.
fn compare_integer_float(int: i128, float: f64) -> Option<Ordering> {
    if float.is_nan() {
        return None;
    }
    let bound = 2f64.powi(127);
    if float >= bound {
        return Some(Ordering::Less);
    }
    if float < -bound {
        return Some(Ordering::Greater);
    }
    // |whole| < 2^127, so the cast is exact
    let whole = float.trunc();
    let fraction = float - whole;
    Some(int.cmp(&(whole as i128)).then_with(|| {
        0f64.partial_cmp(&fraction).unwrap_or(Ordering::Equal)
    }))
}
