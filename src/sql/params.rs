//! Convert serde_json::Value to bindable text; the SQL side casts it to the column type.

use serde_json::Value;

/// Text form of a JSON value. Arrays and objects become JSON text (for `::jsonb`),
/// booleans `true`/`false` (for `::boolean`), null stays null.
pub fn bind_text(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => Some(v.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_values_become_text() {
        assert_eq!(bind_text(&Value::Null), None);
        assert_eq!(bind_text(&json!(true)).as_deref(), Some("true"));
        assert_eq!(bind_text(&json!(7)).as_deref(), Some("7"));
        assert_eq!(bind_text(&json!("HIRED")).as_deref(), Some("HIRED"));
        assert_eq!(bind_text(&json!(["python", "go"])).as_deref(), Some("[\"python\",\"go\"]"));
    }
}
