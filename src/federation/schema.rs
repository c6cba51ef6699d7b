//! Remote tool descriptors and tolerant parsing of remote responses.

use serde::{Deserialize, Serialize};

use crate::error::{unified, MeshError};
use crate::tools::ToolResponse;

/// A tool as advertised by a remote endpoint, before namespacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteTool {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "empty_object_schema")]
    pub input_schema: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

impl RemoteTool {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema: empty_object_schema(),
            output_schema: None,
            keywords: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_input_schema(mut self, schema: serde_json::Value) -> Self {
        self.input_schema = schema;
        self
    }
}

fn empty_object_schema() -> serde_json::Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

/// One page of a `tools/list` result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolPage {
    pub tools: Vec<RemoteTool>,
    pub next_cursor: Option<String>,
}

/// Parse a `tools/list` result, skipping entries that are not usable tools.
///
/// An entry needs a non-empty string `name`; a non-object `inputSchema` is
/// replaced by an empty object schema.
pub fn parse_tool_page(result: &serde_json::Value) -> ToolPage {
    let entries = result
        .get("tools")
        .and_then(|tools| tools.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut tools = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        match parse_tool_entry(entry) {
            Some(tool) => tools.push(tool),
            None => tracing::warn!(index, "skipping malformed remote tool entry"),
        }
    }

    let next_cursor = result
        .get("nextCursor")
        .and_then(|cursor| cursor.as_str())
        .filter(|cursor| !cursor.is_empty())
        .map(str::to_owned);

    ToolPage { tools, next_cursor }
}

fn parse_tool_entry(entry: &serde_json::Value) -> Option<RemoteTool> {
    let object = entry.as_object()?;
    let name = object
        .get("name")
        .and_then(|name| name.as_str())
        .map(str::trim)
        .filter(|name| !name.is_empty())?;

    let input_schema = object
        .get("inputSchema")
        .filter(|schema| schema.is_object())
        .cloned()
        .unwrap_or_else(empty_object_schema);

    let keywords = object
        .get("keywords")
        .and_then(|k| k.as_array())
        .map(|k| {
            k.iter()
                .filter_map(|word| word.as_str().map(str::to_owned))
                .collect()
        })
        .unwrap_or_default();

    Some(RemoteTool {
        name: name.to_owned(),
        description: object
            .get("description")
            .and_then(|d| d.as_str())
            .map(str::to_owned),
        input_schema,
        output_schema: object.get("outputSchema").filter(|s| s.is_object()).cloned(),
        keywords,
    })
}

/// Normalize outbound call arguments into a JSON object (or nothing).
///
/// A string holding a JSON object is accepted and parsed.
pub fn coerce_tool_arguments(
    value: serde_json::Value,
) -> Result<Option<serde_json::Map<String, serde_json::Value>>, MeshError> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Object(map) => Ok(Some(map)),
        serde_json::Value::String(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            let parsed: serde_json::Value = serde_json::from_str(trimmed).map_err(|e| {
                MeshError::invalid_params("arguments", format!("must be valid JSON: {e}"))
            })?;
            coerce_tool_arguments(parsed)
        }
        other => Err(MeshError::invalid_params(
            "arguments",
            format!("must be a JSON object; got {other}"),
        )),
    }
}

/// Map a `tools/call` result into a [`ToolResponse`].
///
/// Results flagged `isError` become [`MeshError::Application`] carrying the
/// text (or structured content) as the message.
pub fn map_call_result(name: &str, result: serde_json::Value) -> Result<ToolResponse, MeshError> {
    let response: ToolResponse = serde_json::from_value(result)?;
    if !response.is_error {
        return Ok(response);
    }

    let message = response
        .text_content()
        .or_else(|| response.structured_content.as_ref().map(|v| v.to_string()))
        .unwrap_or_else(|| format!("remote tool '{name}' returned an error result"));
    Err(MeshError::Application {
        code: unified::REMOTE_TOOL_ERROR,
        message,
        data: response.structured_content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_tool_page_skips_malformed_entries() {
        let page = parse_tool_page(&json!({
            "tools": [
                { "name": "ok", "description": "fine", "inputSchema": { "type": "object" } },
                { "description": "no name" },
                "not an object",
                { "name": "   " },
                { "name": "bad_schema", "inputSchema": "nope", "keywords": ["x", 3] }
            ],
            "nextCursor": "page-2"
        }));

        let names: Vec<&str> = page.tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["ok", "bad_schema"]);
        assert_eq!(page.tools[1].input_schema, empty_object_schema());
        assert_eq!(page.tools[1].keywords, vec!["x".to_string()]);
        assert_eq!(page.next_cursor.as_deref(), Some("page-2"));
    }

    #[test]
    fn parse_tool_page_tolerates_missing_tools_and_null_cursor() {
        let page = parse_tool_page(&json!({ "nextCursor": null }));
        assert!(page.tools.is_empty());
        assert_eq!(page.next_cursor, None);
    }

    #[test]
    fn coerce_tool_arguments_accepts_object_and_stringified_object() {
        let from_object = coerce_tool_arguments(json!({ "a": 1 })).unwrap().unwrap();
        assert_eq!(from_object.get("a"), Some(&json!(1)));

        let from_string = coerce_tool_arguments(json!("{\"a\": 2}")).unwrap().unwrap();
        assert_eq!(from_string.get("a"), Some(&json!(2)));

        assert!(coerce_tool_arguments(json!(null)).unwrap().is_none());
        assert!(coerce_tool_arguments(json!("  ")).unwrap().is_none());
    }

    #[test]
    fn coerce_tool_arguments_rejects_non_object() {
        let err = coerce_tool_arguments(json!([1, 2])).unwrap_err();
        assert!(matches!(err, MeshError::InvalidParams { .. }));

        let err = coerce_tool_arguments(json!("{not json")).unwrap_err();
        assert!(matches!(err, MeshError::InvalidParams { .. }));
    }

    #[test]
    fn map_call_result_maps_is_error_to_application() {
        let err = map_call_result(
            "g.fail",
            json!({ "content": [{ "type": "text", "text": "boom" }], "isError": true }),
        )
        .unwrap_err();

        match err {
            MeshError::Application { code, message, .. } => {
                assert_eq!(code, unified::REMOTE_TOOL_ERROR);
                assert_eq!(message, "boom");
            }
            other => panic!("expected Application, got {other:?}"),
        }
    }

    #[test]
    fn map_call_result_passes_success_through() {
        let response = map_call_result(
            "g.ok",
            json!({ "content": [{ "type": "text", "text": "done" }], "structuredContent": { "n": 1 } }),
        )
        .unwrap();
        assert_eq!(response.text_content().as_deref(), Some("done"));
        assert_eq!(response.structured_content, Some(json!({ "n": 1 })));
    }
}
