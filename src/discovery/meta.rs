//! The synthetic `tool_search` and `execute_tool` meta-tools.

use std::sync::{Arc, OnceLock};

use serde::Deserialize;

use crate::error::MeshError;
use crate::tools::{ToolArguments, ToolDefinition, ToolParameters};

pub const TOOL_SEARCH: &str = "tool_search";
pub const EXECUTE_TOOL: &str = "execute_tool";

pub fn is_meta_tool(name: &str) -> bool {
    name == TOOL_SEARCH || name == EXECUTE_TOOL
}

/// Definition advertised for `tool_search`.
pub fn tool_search_definition() -> Arc<ToolDefinition> {
    static DEF: OnceLock<Arc<ToolDefinition>> = OnceLock::new();
    Arc::clone(DEF.get_or_init(|| {
        Arc::new(
            ToolDefinition::new(
                TOOL_SEARCH,
                "Search for additional tools that are not listed by default. \
                 Returns ranked matches with their input schemas; invoke one with execute_tool.",
                ToolParameters::object()
                    .string(
                        "query",
                        "Words to match against tool names, keywords and descriptions. Empty lists everything.",
                        false,
                    )
                    .integer("max_results", "Maximum number of matches to return (1-100)", false)
                    .build(),
            )
            .with_keywords(["search", "discover", "find"]),
        )
    }))
}

/// Definition advertised for `execute_tool`.
pub fn execute_tool_definition() -> Arc<ToolDefinition> {
    static DEF: OnceLock<Arc<ToolDefinition>> = OnceLock::new();
    Arc::clone(DEF.get_or_init(|| {
        Arc::new(
            ToolDefinition::new(
                EXECUTE_TOOL,
                "Execute a tool found through tool_search by its exact name.",
                ToolParameters::object()
                    .string("name", "Exact name of the tool to execute", true)
                    .object("arguments", "Arguments for the tool", false)
                    .build(),
            )
            .with_keywords(["execute", "run", "call"]),
        )
    }))
}

/// Parsed `tool_search` arguments.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchRequest {
    /// Absent or null lists every Discoverable tool.
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub max_results: Option<i64>,
}

impl SearchRequest {
    pub fn from_arguments(args: &ToolArguments) -> Result<Self, MeshError> {
        args.deserialize()
    }

    pub fn query(&self) -> &str {
        self.query.as_deref().unwrap_or_default()
    }
}

/// Parsed `execute_tool` arguments.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExecuteRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl ExecuteRequest {
    pub fn from_arguments(args: &ToolArguments) -> Result<Self, MeshError> {
        let request: Self = args.deserialize()?;
        if request.name.trim().is_empty() {
            return Err(MeshError::invalid_params("name", "required field is empty"));
        }
        if is_meta_tool(&request.name) {
            return Err(MeshError::invalid_params(
                "name",
                format!("'{}' cannot be executed indirectly", request.name),
            ));
        }
        if !(request.arguments.is_object() || request.arguments.is_null()) {
            return Err(MeshError::invalid_params("arguments", "expected an object"));
        }
        Ok(request)
    }

    pub fn into_arguments(self) -> ToolArguments {
        match self.arguments {
            serde_json::Value::Null => ToolArguments::new(serde_json::json!({})),
            value => ToolArguments::new(value),
        }
    }
}
