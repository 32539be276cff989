//! Optional-path lookups over `serde_json::Value` trees
//!
//! Every step returns `Option`, and JSON `null` is treated the same as a
//! missing key, so a lookup never fails halfway through.

use serde_json::Value;

/// Follows object keys from `root`, returning the value at the end of `path`
///
/// # Examples
///
/// ```
/// use rental_harvest::flatten::json_path::get_path;
/// use serde_json::json;
///
/// let data = json!({"location": {"address": {"street": null}}});
/// assert!(get_path(&data, &["location", "address"]).is_some());
/// assert!(get_path(&data, &["location", "address", "street", "name"]).is_none());
/// ```
pub fn get_path<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(root, |value, key| value.as_object()?.get(*key))
        .filter(|value| !value.is_null())
}

/// Renders a scalar as text
///
/// Strings are returned without quotes, numbers and booleans in their JSON
/// form. Nested arrays or objects are kept as compact JSON.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// First element of a list, or the value itself when it is not a list
pub fn first_text(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => items.first().and_then(scalar_text),
        other => scalar_text(other),
    }
}

/// List elements joined with `", "`; empty lists yield `None`
pub fn joined_text(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(scalar_text).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        other => scalar_text(other),
    }
}
