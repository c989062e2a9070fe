//! Coercions and ordering over loosely-typed JSON record values.
//!
//! Records come from arbitrary JSON, so a field may hold any JSON value or be
//! missing entirely. Missing is modelled as `None` and is distinct from
//! `Some(Value::Null)` wherever the two print differently.

use serde_json::{Number, Value};
use std::cmp::Ordering;

/// Key used for a missing field when partitioning records into groups.
pub const MISSING_KEY: &str = "undefined";

/// Render a number the way it reads in source JSON: integral floats lose
/// their trailing `.0`, so `1.0` and `1` produce the same key.
pub fn number_to_string(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e21 => format!("{}", f as i128),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

/// String form of a present value. Arrays join their elements with `,`;
/// nested objects fall back to compact JSON.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_to_string(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => value_to_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// Group key for a field value. Missing fields share the `undefined` bucket,
/// explicit nulls land in `null`.
pub fn group_key(value: Option<&Value>) -> String {
    match value {
        None => MISSING_KEY.to_string(),
        Some(v) => value_to_string(v),
    }
}

/// Membership coercion: missing and null both become the empty string.
pub fn coerce_string(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(v) => value_to_string(v),
    }
}

/// Cell text for CSV output: missing and null are empty cells.
pub fn cell_string(value: Option<&Value>) -> String {
    coerce_string(value)
}

pub fn is_nil(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

pub fn as_number(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64)
}

fn kind_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

/// Total order used by the sort engine. Values of the same kind use their
/// natural ordering (numeric, lexical, false < true); values of different
/// kinds order by kind with missing/null first.
pub fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x @ Value::Array(_)), Some(y @ Value::Array(_)))
        | (Some(x @ Value::Object(_)), Some(y @ Value::Object(_))) => {
            value_to_string(x).cmp(&value_to_string(y))
        }
        _ => kind_rank(a).cmp(&kind_rank(b)),
    }
}
