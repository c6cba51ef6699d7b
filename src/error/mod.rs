//! Error types for toolmesh.

pub mod unified;

pub use unified::{ErrorCategory, RpcError};

use thiserror::Error;

/// Primary error type for all toolmesh operations.
#[derive(Error, Debug)]
pub enum MeshError {
    #[error("tool not found: {0}")]
    UnknownTool(String),

    #[error("tool not permitted: {0}")]
    Filtered(String),

    #[error("invalid params: {field}: {message}")]
    InvalidParams { field: String, message: String },

    #[error("internal error: {0}")]
    Internal(String),

    /// Domain error raised by a tool handler (or a remote tool) with its own code.
    #[error("tool error {code}: {message}")]
    Application {
        code: i64,
        message: String,
        data: Option<serde_json::Value>,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Remote error ({endpoint}): {message}")]
    Remote { endpoint: String, message: String },

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Session error: {0}")]
    Session(String),
}

impl MeshError {
    /// Create an invalid-params error for a named field.
    pub fn invalid_params(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParams {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an application error carrying a handler-defined code.
    pub fn application(code: i64, message: impl Into<String>) -> Self {
        Self::Application {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create an application error with structured data attached.
    pub fn application_with_data(
        code: i64,
        message: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self::Application {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownTool(_) => ErrorCategory::NotFound,
            Self::Filtered(_) => ErrorCategory::NotPermitted,
            Self::InvalidParams { .. } => ErrorCategory::InvalidParams,
            Self::Application { .. } => ErrorCategory::Application,
            Self::Cancelled => ErrorCategory::Cancelled,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Authentication(_) => ErrorCategory::Authentication,
            Self::Network(_) | Self::Remote { .. } => ErrorCategory::Transport,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Session(_) => ErrorCategory::Session,
            Self::Internal(_) | Self::Io(_) => ErrorCategory::Internal,
        }
    }

    /// Whether the error means "the name did not resolve to a callable tool".
    pub fn is_resolution_failure(&self) -> bool {
        matches!(self, Self::UnknownTool(_) | Self::Filtered(_))
    }

    /// Convert into the object the framing layer serializes as a JSON-RPC error.
    pub fn to_rpc_error(&self) -> RpcError {
        match self {
            Self::UnknownTool(_) => RpcError::new(unified::TOOL_NOT_FOUND, self.to_string()),
            Self::Filtered(_) => RpcError::new(unified::TOOL_NOT_PERMITTED, self.to_string()),
            Self::InvalidParams { field, .. } => {
                RpcError::new(unified::INVALID_PARAMS, self.to_string())
                    .with_data(serde_json::json!({ "field": field }))
            }
            Self::Application {
                code,
                message,
                data,
            } => RpcError {
                code: *code,
                message: message.clone(),
                data: data.clone(),
            },
            Self::Cancelled => RpcError::new(unified::REQUEST_CANCELLED, self.to_string()),
            _ => RpcError::new(unified::INTERNAL_ERROR, self.to_string()),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, MeshError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_and_filtered_are_distinct_classes() {
        let unknown = MeshError::UnknownTool("g.missing".into());
        let filtered = MeshError::Filtered("g.secret".into());

        assert_eq!(unknown.category(), ErrorCategory::NotFound);
        assert_eq!(filtered.category(), ErrorCategory::NotPermitted);
        assert_ne!(unknown.to_rpc_error().code, filtered.to_rpc_error().code);
        assert!(unknown.is_resolution_failure());
        assert!(filtered.is_resolution_failure());
    }

    #[test]
    fn invalid_params_names_the_field() {
        let err = MeshError::invalid_params("msg", "required field is missing");
        let rpc = err.to_rpc_error();

        assert_eq!(rpc.code, unified::INVALID_PARAMS);
        assert!(rpc.message.contains("msg"), "message: {}", rpc.message);
        assert_eq!(rpc.data, Some(serde_json::json!({ "field": "msg" })));
    }

    #[test]
    fn application_errors_keep_their_code_and_data() {
        let err = MeshError::application_with_data(
            4004,
            "quota exhausted",
            serde_json::json!({ "remaining": 0 }),
        );
        let rpc = err.to_rpc_error();

        assert_eq!(rpc.code, 4004);
        assert_eq!(rpc.message, "quota exhausted");
        assert_eq!(rpc.data, Some(serde_json::json!({ "remaining": 0 })));
        assert!(!err.is_resolution_failure());
    }

    #[test]
    fn transport_failures_map_to_internal_wire_code() {
        let err = MeshError::Remote {
            endpoint: "http://remote".into(),
            message: "connection reset".into(),
        };
        assert_eq!(err.category(), ErrorCategory::Transport);
        assert_eq!(err.to_rpc_error().code, unified::INTERNAL_ERROR);
    }
}
