//! Conversions between JSON values and SQLite values.

use serde_json::Value;
use tokio_rusqlite::rusqlite::types::{Value as SqlValue, ValueRef};

pub(crate) fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                SqlValue::Real(f)
            } else {
                SqlValue::Text(n.to_string())
            }
        }
        Value::String(s) => SqlValue::Text(s.clone()),
        // Arrays and objects are bound as their JSON text.
        other => SqlValue::Text(other.to_string()),
    }
}

pub(crate) fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Array(b.iter().map(|byte| Value::from(*byte)).collect()),
    }
}

/// Prefix a named parameter with `:` unless it already carries a sigil.
pub(crate) fn param_name(name: &str) -> String {
    if name.starts_with([':', '@', '$']) { name.to_string() } else { format!(":{name}") }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_sql_scalars() {
        assert_eq!(to_sql(&json!(null)), SqlValue::Null);
        assert_eq!(to_sql(&json!(true)), SqlValue::Integer(1));
        assert_eq!(to_sql(&json!(42)), SqlValue::Integer(42));
        assert_eq!(to_sql(&json!(1.5)), SqlValue::Real(1.5));
        assert_eq!(to_sql(&json!("x")), SqlValue::Text("x".to_string()));
        assert_eq!(to_sql(&json!([1, 2])), SqlValue::Text("[1,2]".to_string()));
    }

    #[test]
    fn test_from_sql() {
        assert_eq!(from_sql(ValueRef::Null), json!(null));
        assert_eq!(from_sql(ValueRef::Integer(7)), json!(7));
        assert_eq!(from_sql(ValueRef::Real(f64::NAN)), json!(null));
        assert_eq!(from_sql(ValueRef::Text(b"abc")), json!("abc"));
        assert_eq!(from_sql(ValueRef::Blob(&[1, 255])), json!([1, 255]));
    }

    #[test]
    fn test_param_name() {
        assert_eq!(param_name("name"), ":name");
        assert_eq!(param_name(":name"), ":name");
        assert_eq!(param_name("@name"), "@name");
        assert_eq!(param_name("$name"), "$name");
    }
}
