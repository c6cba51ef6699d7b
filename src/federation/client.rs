//! HTTP client for one remote tool endpoint.
//!
//! Speaks JSON-RPC 2.0 over POST. The first request performs the
//! `initialize` handshake followed by `notifications/initialized`; any
//! `Mcp-Session-Id` the remote issues is replayed on every later request.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;

use super::binding::RemoteToolSource;
use super::schema::{coerce_tool_arguments, map_call_result, parse_tool_page, RemoteTool};
use super::stream::decode_rpc_body;
use crate::auth::{AuthProvider, NoAuth};
use crate::error::MeshError;
use crate::tools::ToolResponse;
use crate::util::timeout::with_timeout;

/// Header carrying the remote-issued session id.
pub const SESSION_HEADER: &str = "mcp-session-id";
/// Header carrying the negotiated protocol version after the handshake.
pub const PROTOCOL_VERSION_HEADER: &str = "mcp-protocol-version";

const DEFAULT_PROTOCOL_VERSION: &str = "2025-03-26";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Stop following `nextCursor` after this many pages.
const MAX_LIST_PAGES: usize = 64;

/// What the remote reported during the handshake.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteServerInfo {
    #[serde(default)]
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: serde_json::Value,
    #[serde(default)]
    pub server_info: Option<RemoteImplementation>,
    #[serde(default)]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RemoteImplementation {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// Client for a single federated endpoint.
pub struct FederationClient {
    endpoint: String,
    http: reqwest::Client,
    auth: Arc<dyn AuthProvider>,
    timeout: Duration,
    protocol_version: String,
    client_name: String,
    client_version: String,
    next_id: AtomicU64,
    initialized: AtomicBool,
    handshake: tokio::sync::Mutex<()>,
    session_id: RwLock<Option<String>>,
    server_info: RwLock<Option<RemoteServerInfo>>,
}

impl std::fmt::Debug for FederationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FederationClient")
            .field("endpoint", &self.endpoint)
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

enum SendFailure {
    Unauthorized(MeshError),
    SessionExpired,
    Other(MeshError),
}

impl FederationClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            http: reqwest::Client::new(),
            auth: Arc::new(NoAuth),
            timeout: DEFAULT_TIMEOUT,
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            client_name: env!("CARGO_PKG_NAME").to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            next_id: AtomicU64::new(1),
            initialized: AtomicBool::new(false),
            handshake: tokio::sync::Mutex::new(()),
            session_id: RwLock::new(None),
            server_info: RwLock::new(None),
        }
    }

    pub fn with_auth(mut self, auth: Arc<dyn AuthProvider>) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = version.into();
        self
    }

    pub fn with_client_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.client_name = name.into();
        self.client_version = version.into();
        self
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Session id issued by the remote, if any.
    pub fn session_id(&self) -> Option<String> {
        self.session_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn server_info(&self) -> Option<RemoteServerInfo> {
        self.server_info
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Perform the handshake if it has not happened yet.
    pub async fn initialize(&self) -> Result<(), MeshError> {
        if self.is_initialized() {
            return Ok(());
        }
        let _guard = self.handshake.lock().await;
        if self.is_initialized() {
            return Ok(());
        }

        let params = serde_json::json!({
            "protocolVersion": self.protocol_version,
            "capabilities": {},
            "clientInfo": {
                "name": self.client_name,
                "version": self.client_version,
            },
        });
        let result = self.request_once("initialize", params).await?;
        let info: RemoteServerInfo = serde_json::from_value(result).unwrap_or_default();
        tracing::debug!(
            endpoint = %self.endpoint,
            protocol_version = %info.protocol_version,
            session = self.session_id().is_some(),
            "federation handshake complete"
        );
        *self
            .server_info
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(info);

        self.notify("notifications/initialized").await?;
        self.initialized.store(true, Ordering::Release);
        Ok(())
    }

    /// List every tool the remote advertises, following pagination.
    pub async fn list_tools(&self) -> Result<Vec<RemoteTool>, MeshError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let params = match &cursor {
                Some(cursor) => serde_json::json!({ "cursor": cursor }),
                None => serde_json::json!({}),
            };
            let result = self.request("tools/list", params).await?;
            let page = parse_tool_page(&result);
            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
                _ => return Ok(tools),
            }
        }

        tracing::warn!(endpoint = %self.endpoint, pages = MAX_LIST_PAGES, "tool listing truncated");
        Ok(tools)
    }

    /// Call a remote tool by its unqualified name.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<ToolResponse, MeshError> {
        let mut params = serde_json::json!({ "name": name });
        if let Some(arguments) = coerce_tool_arguments(arguments)? {
            params["arguments"] = serde_json::Value::Object(arguments);
        }
        let result = self.request("tools/call", params).await?;
        map_call_result(name, result)
    }

    /// Send a request after the handshake, recovering once from an expired session.
    async fn request(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, MeshError> {
        self.initialize().await?;
        match self.request_once(method, params.clone()).await {
            Err(MeshError::Session(message)) => {
                tracing::debug!(endpoint = %self.endpoint, %message, "remote session expired; re-initializing");
                self.reset_session();
                self.initialize().await?;
                self.request_once(method, params).await
            }
            other => other,
        }
    }

    /// Send one request, refreshing credentials and retrying once on 401/403.
    async fn request_once(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, MeshError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let message = match self.send(&body, Some(id)).await {
            Ok(message) => message,
            Err(SendFailure::Unauthorized(error)) => {
                tracing::debug!(endpoint = %self.endpoint, %error, "refreshing federation credentials");
                self.auth.refresh().await?;
                self.send(&body, Some(id)).await.map_err(SendFailure::into_error)?
            }
            Err(failure) => return Err(failure.into_error()),
        };

        let message = message.unwrap_or_default();
        if let Some(error) = message.get("error") {
            return Err(self.rpc_error(method, error));
        }
        Ok(message
            .get("result")
            .cloned()
            .unwrap_or_else(|| serde_json::json!({})))
    }

    async fn notify(&self, method: &str) -> Result<(), MeshError> {
        let body = serde_json::json!({ "jsonrpc": "2.0", "method": method });
        self.send(&body, None)
            .await
            .map(|_| ())
            .map_err(SendFailure::into_error)
    }

    async fn send(
        &self,
        body: &serde_json::Value,
        id: Option<u64>,
    ) -> Result<Option<serde_json::Value>, SendFailure> {
        with_timeout(self.timeout, self.send_inner(body, id))
            .await
            .map_err(|error| match error {
                MeshError::Authentication(_) => SendFailure::Unauthorized(error),
                MeshError::Session(_) => SendFailure::SessionExpired,
                other => SendFailure::Other(other),
            })
    }

    async fn send_inner(
        &self,
        body: &serde_json::Value,
        id: Option<u64>,
    ) -> Result<Option<serde_json::Value>, MeshError> {
        let mut request = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json, text/event-stream")
            .json(body);

        if let Some(header) = self.auth.auth_header().await? {
            let value = HeaderValue::from_str(&header)
                .map_err(|e| MeshError::Authentication(format!("invalid auth header: {e}")))?;
            request = request.header(AUTHORIZATION, value);
        }
        let session_id = self.session_id();
        if let Some(session_id) = &session_id {
            request = request.header(SESSION_HEADER, session_id);
        }
        if self.is_initialized() {
            request = request.header(PROTOCOL_VERSION_HEADER, &self.protocol_version);
        }

        let response = request.send().await?;
        let status = response.status();

        if let Some(issued) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            *self
                .session_id
                .write()
                .unwrap_or_else(PoisonError::into_inner) = Some(issued.to_string());
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let text = response.text().await?;

        if !status.is_success() {
            return Err(self.status_to_error(status.as_u16(), &text, session_id.is_some()));
        }

        match id {
            None => Ok(None),
            Some(_) if text.trim().is_empty() => Err(MeshError::Remote {
                endpoint: self.endpoint.clone(),
                message: "empty response body".into(),
            }),
            Some(id) => decode_rpc_body(content_type.as_deref(), &text, id).map(Some),
        }
    }

    fn status_to_error(&self, status: u16, body: &str, had_session: bool) -> MeshError {
        match status {
            401 | 403 => MeshError::Authentication(format!("{} ({status}): {body}", self.endpoint)),
            404 if had_session => MeshError::Session(format!("session not found at {}", self.endpoint)),
            _ => MeshError::Remote {
                endpoint: self.endpoint.clone(),
                message: format!("HTTP {status}: {body}"),
            },
        }
    }

    /// JSON-RPC errors from `tools/call` are the tool's own errors; anything
    /// else is a transport-level failure of the federation link.
    fn rpc_error(&self, method: &str, error: &serde_json::Value) -> MeshError {
        let code = error.get("code").and_then(|c| c.as_i64()).unwrap_or(-32603);
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("remote error")
            .to_string();
        if method == "tools/call" {
            MeshError::Application {
                code,
                message,
                data: error.get("data").cloned(),
            }
        } else {
            MeshError::Remote {
                endpoint: self.endpoint.clone(),
                message: format!("{method} failed ({code}): {message}"),
            }
        }
    }

    fn reset_session(&self) {
        self.initialized.store(false, Ordering::Release);
        *self
            .session_id
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl SendFailure {
    fn into_error(self) -> MeshError {
        match self {
            Self::Unauthorized(error) | Self::Other(error) => error,
            Self::SessionExpired => MeshError::Session("remote session expired".into()),
        }
    }
}

#[async_trait]
impl RemoteToolSource for FederationClient {
    async fn list_tools(&self) -> Result<Vec<RemoteTool>, MeshError> {
        FederationClient::list_tools(self).await
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<ToolResponse, MeshError> {
        FederationClient::call_tool(self, name, arguments).await
    }

    fn describe(&self) -> String {
        self.endpoint.clone()
    }
}
