//! Dotted-path resolution against a JSON render context.

use serde_json::Value;

/// Walk `a.b.c` through nested objects. Only objects are descended into, so a
/// path that runs into a string, number or array resolves to `None`.
pub fn lookup<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    let mut value = context;
    for key in path.split('.') {
        value = value.as_object()?.get(key)?;
    }
    Some(value)
}

/// Text form of a resolved value, or `None` when the value has no sensible
/// inline rendering (objects and arrays).
pub fn to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(number_text(n)),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// `4.0` prints as `4`, matching how the catalog front end always showed it.
fn number_text(n: &serde_json::Number) -> String {
    if n.is_f64() {
        if let Some(f) = n.as_f64() {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                return format!("{}", f as i64);
            }
        }
    }
    n.to_string()
}
