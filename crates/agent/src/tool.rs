//! Tool catalogue entries and JSON-schema argument validation.
//!
//! The schema validator here is intentionally narrow: it understands
//! `object`/`string`/`number`/`integer`/`boolean`/`array` schemas with
//! `properties`/`required`/`items`, and coerces the unambiguous cases a
//! model commonly gets wrong (a numeric string for a `number` field, a
//! bare value where an array of one was expected). It is not a general
//! JSON-Schema implementation.

use serde_json::{Map, Value};

/// One tool the agent may call, with its argument schema.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON-schema for this tool's arguments object.
    pub parameters: Value,
}

impl ToolDefinition {
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// Why a tool call's arguments were rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentError {
    pub message: String,
}

impl std::fmt::Display for ArgumentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ArgumentError {}

fn error(message: impl Into<String>) -> ArgumentError {
    ArgumentError { message: message.into() }
}

/// Validate `arguments` against `schema`, coercing unambiguous type
/// mismatches in place. Returns the (possibly rewritten) arguments.
///
/// # Errors
/// Returns an [`ArgumentError`] naming the field and constraint violated
/// when a required field is missing or a value can't be coerced to the
/// declared type.
pub fn validate_and_coerce(schema: &Value, arguments: &Value) -> Result<Value, ArgumentError> {
    coerce_value(schema, arguments, "$")
}

fn schema_type(schema: &Value) -> Option<&str> {
    schema.get("type").and_then(Value::as_str)
}

fn coerce_value(schema: &Value, value: &Value, path: &str) -> Result<Value, ArgumentError> {
    match schema_type(schema) {
        Some("object") => coerce_object(schema, value, path),
        Some("array") => coerce_array(schema, value, path),
        Some("string") => coerce_string(value, path),
        Some("number") => coerce_number(value, path),
        Some("integer") => coerce_integer(value, path),
        Some("boolean") => coerce_boolean(value, path),
        _ => Ok(value.clone()),
    }
}

fn coerce_object(schema: &Value, value: &Value, path: &str) -> Result<Value, ArgumentError> {
    let Some(obj) = value.as_object() else {
        return Err(error(format!("{path}: expected object")));
    };

    let properties = schema.get("properties").and_then(Value::as_object);
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    for field in &required {
        if !obj.contains_key(*field) {
            return Err(error(format!("{path}: missing required field \"{field}\"")));
        }
    }

    let mut result = Map::new();
    for (key, val) in obj {
        let coerced = match properties.and_then(|p| p.get(key)) {
            Some(field_schema) => coerce_value(field_schema, val, &format!("{path}.{key}"))?,
            None => val.clone(),
        };
        result.insert(key.clone(), coerced);
    }
    Ok(Value::Object(result))
}

fn coerce_array(schema: &Value, value: &Value, path: &str) -> Result<Value, ArgumentError> {
    let items_schema = schema.get("items");
    let values: Vec<Value> = match value {
        Value::Array(items) => items.clone(),
        // A model that returns a single value where an array was
        // expected is a common, unambiguous slip to fix up.
        other => vec![other.clone()],
    };

    let coerced: Result<Vec<Value>, ArgumentError> = values
        .iter()
        .enumerate()
        .map(|(i, v)| match items_schema {
            Some(item_schema) => coerce_value(item_schema, v, &format!("{path}[{i}]")),
            None => Ok(v.clone()),
        })
        .collect();
    Ok(Value::Array(coerced?))
}

fn coerce_string(value: &Value, path: &str) -> Result<Value, ArgumentError> {
    match value {
        Value::String(_) => Ok(value.clone()),
        Value::Number(n) => Ok(Value::String(n.to_string())),
        Value::Bool(b) => Ok(Value::String(b.to_string())),
        _ => Err(error(format!("{path}: expected string"))),
    }
}

fn coerce_number(value: &Value, path: &str) -> Result<Value, ArgumentError> {
    match value {
        Value::Number(_) => Ok(value.clone()),
        Value::String(s) => s
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| error(format!("{path}: expected number, got non-numeric string \"{s}\""))),
        _ => Err(error(format!("{path}: expected number"))),
    }
}

fn coerce_integer(value: &Value, path: &str) -> Result<Value, ArgumentError> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
        Value::Number(n) => Err(error(format!("{path}: expected integer, got fractional number {n}"))),
        Value::String(s) => s
            .parse::<i64>()
            .map(|i| Value::Number(i.into()))
            .map_err(|_| error(format!("{path}: expected integer, got non-numeric string \"{s}\""))),
        _ => Err(error(format!("{path}: expected integer"))),
    }
}

fn coerce_boolean(value: &Value, path: &str) -> Result<Value, ArgumentError> {
    match value {
        Value::Bool(_) => Ok(value.clone()),
        Value::String(s) if s == "true" => Ok(Value::Bool(true)),
        Value::String(s) if s == "false" => Ok(Value::Bool(false)),
        _ => Err(error(format!("{path}: expected boolean"))),
    }
}
