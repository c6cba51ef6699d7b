//! Validate tool call arguments against the stored input schema before execution.

use crate::error::MeshError;

/// Validate tool arguments against a JSON Schema.
///
/// Every field named in `required` must be present, non-null and not the empty
/// string. Present properties are checked against their declared top-level
/// `type`. The first violation is returned as [`MeshError::InvalidParams`]
/// naming the offending field.
pub fn validate_arguments(
    args: &serde_json::Value,
    schema: &serde_json::Value,
) -> Result<(), MeshError> {
    let expects_object = schema.get("type").and_then(|v| v.as_str()) == Some("object");
    if expects_object && !args.is_object() && !args.is_null() {
        return Err(MeshError::invalid_params(
            "arguments",
            format!("expected object arguments, got {}", json_type_name(args)),
        ));
    }

    let empty = serde_json::Map::new();
    let obj = args.as_object().unwrap_or(&empty);

    if let Some(required) = schema.get("required").and_then(|v| v.as_array()) {
        for name in required.iter().filter_map(|field| field.as_str()) {
            match obj.get(name) {
                None => {
                    return Err(MeshError::invalid_params(name, "missing required field"));
                }
                Some(serde_json::Value::Null) => {
                    return Err(MeshError::invalid_params(name, "required field is null"));
                }
                Some(serde_json::Value::String(s)) if s.is_empty() => {
                    return Err(MeshError::invalid_params(name, "required field is empty"));
                }
                Some(_) => {}
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(|v| v.as_object()) {
        for (key, value) in obj {
            let Some(expected_type) = properties
                .get(key)
                .and_then(|prop| prop.get("type"))
                .and_then(|t| t.as_str())
            else {
                continue;
            };
            // Optional fields sent as explicit null are treated as absent.
            if value.is_null() {
                continue;
            }
            if !value_matches_type(value, expected_type) {
                return Err(MeshError::invalid_params(
                    key.as_str(),
                    format!(
                        "expected type '{expected_type}', got {}",
                        json_type_name(value)
                    ),
                ));
            }
        }
    }

    Ok(())
}

fn value_matches_type(value: &serde_json::Value, expected: &str) -> bool {
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

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
