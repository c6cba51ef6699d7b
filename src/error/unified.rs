//! Unified error classification and wire codes.

use serde::{Deserialize, Serialize};

/// JSON-RPC: invalid method parameters.
pub const INVALID_PARAMS: i64 = -32602;
/// JSON-RPC: internal error.
pub const INTERNAL_ERROR: i64 = -32603;
/// The requested tool does not resolve anywhere.
pub const TOOL_NOT_FOUND: i64 = -32601;
/// The tool exists upstream but a binding filter rejects it.
pub const TOOL_NOT_PERMITTED: i64 = -32001;
/// The request was cancelled before it completed.
pub const REQUEST_CANCELLED: i64 = -32800;
/// A federated tool returned a result flagged `isError`.
pub const REMOTE_TOOL_ERROR: i64 = -32000;

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    NotFound,
    NotPermitted,
    InvalidParams,
    Application,
    Cancelled,
    Authentication,
    Transport,
    Timeout,
    Configuration,
    Serialization,
    Session,
    Internal,
}

/// Error object handed to the framing layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}
