//! Argument extraction helpers shared by the Anki tools.

use indexmap::IndexMap;
use serde_json::Value;

use crate::tool::ToolError;

fn invalid(msg: impl Into<String>) -> ToolError {
    ToolError::InvalidInput(msg.into())
}

/// A required, non-blank string.
pub fn required_str<'a>(input: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    match input.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.as_str()),
        Some(Value::String(_)) => Err(invalid(format!("'{key}' must not be empty"))),
        Some(_) => Err(invalid(format!("'{key}' must be a string"))),
        None => Err(invalid(format!("missing '{key}' field"))),
    }
}

/// An optional string; blank strings count as absent.
pub fn optional_str<'a>(input: &'a Value, key: &str) -> Result<Option<&'a str>, ToolError> {
    match input.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(invalid(format!("'{key}' must be a string"))),
    }
}

pub fn optional_bool(input: &Value, key: &str) -> Result<Option<bool>, ToolError> {
    match input.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(invalid(format!("'{key}' must be a boolean"))),
    }
}

/// A note id. Accepts a JSON number or a string of digits.
pub fn required_id(input: &Value, key: &str) -> Result<u64, ToolError> {
    match input.get(key) {
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| invalid(format!("'{key}' must be a positive integer"))),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| invalid(format!("'{key}' must be a positive integer"))),
        Some(_) => Err(invalid(format!("'{key}' must be a positive integer"))),
        None => Err(invalid(format!("missing '{key}' field"))),
    }
}

pub fn optional_u64(input: &Value, key: &str) -> Result<Option<u64>, ToolError> {
    match input.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => required_id(input, key).map(Some),
    }
}

/// A list of strings. Absent means empty.
pub fn string_list(input: &Value, key: &str) -> Result<Vec<String>, ToolError> {
    match input.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| invalid(format!("'{key}' must contain only strings")))
            })
            .collect(),
        Some(_) => Err(invalid(format!("'{key}' must be an array of strings"))),
    }
}

/// A required object of field name → value. Numbers and booleans are
/// stringified; nested values are rejected.
pub fn field_map(input: &Value, key: &str) -> Result<IndexMap<String, String>, ToolError> {
    let obj = match input.get(key) {
        Some(Value::Object(obj)) => obj,
        Some(_) => return Err(invalid(format!("'{key}' must be an object"))),
        None => return Err(invalid(format!("missing '{key}' field"))),
    };

    let mut fields = IndexMap::with_capacity(obj.len());
    for (name, value) in obj {
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => String::new(),
            _ => return Err(invalid(format!("field '{name}' must be a string"))),
        };
        fields.insert(name.clone(), text);
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_str() {
        let input = json!({"name": "Spanish", "blank": "  ", "num": 3});
        assert_eq!(required_str(&input, "name").unwrap(), "Spanish");
        assert!(required_str(&input, "blank").is_err());
        assert!(required_str(&input, "num").is_err());
        assert!(required_str(&input, "missing").is_err());
    }

    #[test]
    fn test_optional_str_blank_is_none() {
        let input = json!({"deck": "", "other": "x"});
        assert_eq!(optional_str(&input, "deck").unwrap(), None);
        assert_eq!(optional_str(&input, "other").unwrap(), Some("x"));
        assert_eq!(optional_str(&input, "absent").unwrap(), None);
    }

    #[test]
    fn test_required_id_accepts_numeric_string() {
        let input = json!({"a": 1496198395707u64, "b": "1496198395707", "c": -1, "d": "x"});
        assert_eq!(required_id(&input, "a").unwrap(), 1496198395707);
        assert_eq!(required_id(&input, "b").unwrap(), 1496198395707);
        assert!(required_id(&input, "c").is_err());
        assert!(required_id(&input, "d").is_err());
    }

    #[test]
    fn test_string_list() {
        let input = json!({"tags": ["a", "b"], "bad": ["a", 1]});
        assert_eq!(string_list(&input, "tags").unwrap(), vec!["a", "b"]);
        assert!(string_list(&input, "absent").unwrap().is_empty());
        assert!(string_list(&input, "bad").is_err());
    }

    #[test]
    fn test_field_map() {
        let input = json!({"fields": {"Front": "hola", "Count": 3, "Flag": true}});
        let fields = field_map(&input, "fields").unwrap();
        assert_eq!(fields["Front"], "hola");
        assert_eq!(fields["Count"], "3");
        assert_eq!(fields["Flag"], "true");

        let nested = json!({"fields": {"Front": {"x": 1}}});
        assert!(field_map(&nested, "fields").is_err());
        assert!(field_map(&json!({"fields": []}), "fields").is_err());
    }
}
