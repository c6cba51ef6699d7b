//! Tool call responses.

use serde::{Deserialize, Serialize};

/// One block of tool output content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum Content {
    Text { text: String },
    Image { data: String, mime_type: String },
    /// Any content block this crate does not model explicitly (kept verbatim).
    Other(serde_json::Value),
}

impl From<serde_json::Value> for Content {
    fn from(value: serde_json::Value) -> Self {
        let field = |name: &str| value.get(name).and_then(|v| v.as_str()).map(str::to_owned);
        let parsed = match value.get("type").and_then(|t| t.as_str()) {
            Some("text") => field("text").map(|text| Self::Text { text }),
            Some("image") => field("data")
                .zip(field("mimeType"))
                .map(|(data, mime_type)| Self::Image { data, mime_type }),
            _ => None,
        };
        parsed.unwrap_or(Self::Other(value))
    }
}

impl From<Content> for serde_json::Value {
    fn from(content: Content) -> Self {
        match content {
            Content::Text { text } => serde_json::json!({ "type": "text", "text": text }),
            Content::Image { data, mime_type } => {
                serde_json::json!({ "type": "image", "data": data, "mimeType": mime_type })
            }
            Content::Other(value) => value,
        }
    }
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// Result of a successful tool call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    #[serde(default)]
    pub content: Vec<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolResponse {
    /// A response carrying a single text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(text)],
            ..Default::default()
        }
    }

    /// A response carrying structured content plus its JSON text rendering.
    pub fn structured(value: serde_json::Value) -> Self {
        Self {
            content: vec![Content::text(value.to_string())],
            structured_content: Some(value),
            is_error: false,
        }
    }

    /// Concatenated text blocks, if any.
    pub fn text_content(&self) -> Option<String> {
        let lines: Vec<&str> = self.content.iter().filter_map(Content::as_text).collect();
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }

    pub fn into_value_or_text(self) -> serde_json::Value {
        if let Some(structured) = self.structured_content {
            return structured;
        }
        if let Some(text) = self.text_content() {
            return serde_json::Value::String(text);
        }
        serde_json::to_value(self.content).unwrap_or(serde_json::Value::Null)
    }
}
