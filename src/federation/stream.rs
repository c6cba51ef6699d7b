//! Decoding of JSON-RPC response bodies that may arrive as an event stream.

use crate::error::MeshError;

/// Parse an SSE `data:` line into its payload.
///
/// Returns `None` for non-data lines, blank payloads and `[DONE]`.
pub fn parse_sse_data(line: &str) -> Option<&str> {
    let data = line.strip_prefix("data:")?;
    let data = data.strip_prefix(' ').unwrap_or(data).trim_end();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    Some(data)
}

/// Collect JSON payloads from an event-stream body.
///
/// Comment lines (`:`-prefixed), non-data fields and blank `data:` lines are
/// ignored. Each data line is tried as its own payload; when the lines of one
/// event only parse together they are joined with `\n` as SSE prescribes.
pub fn parse_event_stream(body: &str) -> Vec<serde_json::Value> {
    let mut payloads = Vec::new();
    let mut event: Vec<&str> = Vec::new();

    for line in body.lines().chain(std::iter::once("")) {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            flush_event(&mut event, &mut payloads);
            continue;
        }
        if line.starts_with(':') {
            continue;
        }
        if let Some(data) = parse_sse_data(line) {
            event.push(data);
        }
    }

    payloads
}

fn flush_event(event: &mut Vec<&str>, payloads: &mut Vec<serde_json::Value>) {
    if event.is_empty() {
        return;
    }
    let parsed: Result<Vec<serde_json::Value>, _> =
        event.iter().map(|data| serde_json::from_str(data)).collect();
    match parsed {
        Ok(values) => payloads.extend(values),
        Err(_) => match serde_json::from_str(&event.join("\n")) {
            Ok(value) => payloads.push(value),
            Err(error) => tracing::warn!(%error, "skipping undecodable event-stream payload"),
        },
    }
    event.clear();
}

/// Whether a response should be decoded as an event stream.
pub fn is_event_stream(content_type: Option<&str>, body: &str) -> bool {
    if content_type.is_some_and(|ct| ct.contains("text/event-stream")) {
        return true;
    }
    let head = body.trim_start();
    head.starts_with("data:") || head.starts_with("event:") || head.starts_with(':')
}

/// Decode a response body into the JSON-RPC response matching `id`.
///
/// Plain JSON bodies may be a single message or a batch. For event streams,
/// the message whose `id` matches wins; otherwise the last message carrying
/// `result` or `error` is used.
pub fn decode_rpc_body(
    content_type: Option<&str>,
    body: &str,
    id: u64,
) -> Result<serde_json::Value, MeshError> {
    let messages = if is_event_stream(content_type, body) {
        parse_event_stream(body)
    } else {
        match serde_json::from_str::<serde_json::Value>(body)? {
            serde_json::Value::Array(batch) => batch,
            single => vec![single],
        }
    };

    let is_response = |message: &serde_json::Value| {
        message.get("result").is_some() || message.get("error").is_some()
    };

    let matching = messages
        .iter()
        .position(|message| message.get("id").and_then(|v| v.as_u64()) == Some(id));
    let index = matching.or_else(|| messages.iter().rposition(is_response));

    match index {
        Some(index) => Ok(messages.into_iter().nth(index).unwrap_or_default()),
        None => Err(MeshError::Internal(format!(
            "no JSON-RPC response for request {id} in body"
        ))),
    }
}
