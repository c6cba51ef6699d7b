//! Response body encoders.
//!
//! Search results and structured responses are rendered to text through a
//! [`ResponseEncoder`]. JSON is the built-in encoding; compact text formats
//! plug in behind the same trait.

use crate::error::MeshError;

pub trait ResponseEncoder: Send + Sync {
    /// Short identifier, e.g. `"json"`.
    fn name(&self) -> &str;

    fn content_type(&self) -> &str;

    fn encode(&self, value: &serde_json::Value) -> Result<String, MeshError>;
}

/// JSON encoder, compact by default.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder {
    pretty: bool,
}

impl JsonEncoder {
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl ResponseEncoder for JsonEncoder {
    fn name(&self) -> &str {
        "json"
    }

    fn content_type(&self) -> &str {
        "application/json"
    }

    fn encode(&self, value: &serde_json::Value) -> Result<String, MeshError> {
        let encoded = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        Ok(encoded)
    }
}
