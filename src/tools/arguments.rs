//! Typed access to tool call arguments.

use crate::error::MeshError;

/// Wrapper around tool call arguments providing typed extraction.
#[derive(Debug, Clone, Default)]
pub struct ToolArguments {
    value: serde_json::Value,
}

impl ToolArguments {
    pub fn new(value: serde_json::Value) -> Self {
        Self { value }
    }

    /// Get the raw JSON value.
    pub fn raw(&self) -> &serde_json::Value {
        &self.value
    }

    pub fn into_raw(self) -> serde_json::Value {
        self.value
    }

    /// Get a string argument by key.
    pub fn get_str(&self, key: &str) -> Result<&str, MeshError> {
        self.value
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| MeshError::invalid_params(key, "expected a string argument"))
    }

    /// Get an optional string argument.
    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(|v| v.as_str())
    }

    /// Get an integer argument.
    pub fn get_i64(&self, key: &str) -> Result<i64, MeshError> {
        self.value
            .get(key)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| MeshError::invalid_params(key, "expected an integer argument"))
    }

    /// Get an optional integer argument.
    pub fn get_i64_opt(&self, key: &str) -> Option<i64> {
        self.value.get(key).and_then(|v| v.as_i64())
    }

    /// Get a boolean argument.
    pub fn get_bool(&self, key: &str) -> Result<bool, MeshError> {
        self.value
            .get(key)
            .and_then(|v| v.as_bool())
            .ok_or_else(|| MeshError::invalid_params(key, "expected a boolean argument"))
    }

    /// Get a nested object.
    pub fn get_object(&self, key: &str) -> Result<&serde_json::Value, MeshError> {
        self.value
            .get(key)
            .filter(|v| v.is_object())
            .ok_or_else(|| MeshError::invalid_params(key, "expected an object argument"))
    }

    /// Deserialize the entire arguments into a typed struct.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T, MeshError> {
        let value = match &self.value {
            serde_json::Value::Null => serde_json::json!({}),
            other => other.clone(),
        };
        serde_json::from_value(value)
            .map_err(|e| MeshError::invalid_params("arguments", format!("failed to deserialize: {e}")))
    }
}

impl From<serde_json::Value> for ToolArguments {
    fn from(value: serde_json::Value) -> Self {
        Self::new(value)
    }
}
