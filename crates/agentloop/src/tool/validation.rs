//! Argument validation against a JSON Schema subset.
//!
//! - `validate_args(schema, args)`: object shape, `required` keys, per-property `type`,
//!   string `minLength` / `pattern`, and `additionalProperties: false`.
//! - Used by `ToolRegistry::invoke`; a failure becomes `ToolFailureKind::InvalidArguments`
//!   and the tool is not run.

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::ValidationError;

/// Validates `args` against `schema`.
///
/// Checks, in order: `args` is an object when the schema is an object schema; every key in
/// `schema["required"]` is present; each supplied property matches its declared `type` (and,
/// for strings, `minLength` and `pattern`); no
/// unknown keys when `additionalProperties` is `false`. Keywords outside this set are ignored.
pub fn validate_args(schema: &Value, args: &Value) -> Result<(), ValidationError> {
    let object_schema = schema.get("type").and_then(Value::as_str) == Some("object")
        || schema.get("properties").is_some()
        || schema.get("required").is_some();
    if !object_schema {
        return Ok(());
    }
    let Some(obj) = args.as_object() else {
        return Err(ValidationError(format!(
            "arguments must be a JSON object, got {}",
            json_type_name(args)
        )));
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for key in required.iter().filter_map(Value::as_str) {
            if !obj.contains_key(key) {
                return Err(ValidationError(format!("missing required field: {key}")));
            }
        }
    }

    let properties = schema.get("properties").and_then(Value::as_object);
    if let Some(props) = properties {
        check_properties(props, obj)?;
    }

    if schema.get("additionalProperties") == Some(&Value::Bool(false)) {
        for key in obj.keys() {
            if !properties.is_some_and(|p| p.contains_key(key)) {
                return Err(ValidationError(format!("unexpected field: {key}")));
            }
        }
    }
    Ok(())
}

fn check_properties(
    props: &Map<String, Value>,
    obj: &Map<String, Value>,
) -> Result<(), ValidationError> {
    for (key, value) in obj {
        let Some(prop) = props.get(key) else {
            continue;
        };
        if let Some(expected) = prop.get("type") {
            let ok = match expected {
                Value::String(t) => type_matches(t, value),
                Value::Array(ts) => ts
                    .iter()
                    .filter_map(Value::as_str)
                    .any(|t| type_matches(t, value)),
                _ => true,
            };
            if !ok {
                return Err(ValidationError(format!(
                    "field {key}: expected {}, got {}",
                    expected_label(expected),
                    json_type_name(value)
                )));
            }
        }
        if let Some(s) = value.as_str() {
            check_string(key, prop, s)?;
        }
    }
    Ok(())
}

fn check_string(key: &str, prop: &Value, s: &str) -> Result<(), ValidationError> {
    if let Some(min) = prop.get("minLength").and_then(Value::as_u64) {
        if (s.chars().count() as u64) < min {
            return Err(ValidationError(format!(
                "field {key}: shorter than {min} characters"
            )));
        }
    }
    if let Some(pattern) = prop.get("pattern").and_then(Value::as_str) {
        let re = Regex::new(pattern).map_err(|e| {
            ValidationError(format!("field {key}: schema pattern {pattern:?} is invalid: {e}"))
        })?;
        if !re.is_match(s) {
            return Err(ValidationError(format!(
                "field {key}: does not match pattern {pattern:?}"
            )));
        }
    }
    Ok(())
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn expected_label(expected: &Value) -> String {
    match expected {
        Value::String(t) => t.clone(),
        Value::Array(ts) => ts
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" | "),
        other => other.to_string(),
    }
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
