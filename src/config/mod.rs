//! Configuration system (layered: code > env > TOML file).
//!
//! ```toml
//! server_name = "gateway"
//! namespace_separator = "."
//! default_search_limit = 10
//!
//! [session]
//! secret = "at-least-sixteen-bytes"
//! ttl_secs = 86400
//!
//! [[federation]]
//! namespace = "git"
//! url = "http://localhost:9001/mcp"
//! visibility = "discoverable"
//! bearer_token_env = "GIT_MCP_TOKEN"
//! deny = ["force_push"]
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::{AuthProvider, NoAuth, StaticCredential};
use crate::error::MeshError;
use crate::federation::{allow_deny_filter, FederationBinding, FederationClient, DEFAULT_SEPARATOR};
use crate::tools::scoring::{clamp_max_results, DEFAULT_MAX_RESULTS};
use crate::tools::Visibility;

/// Protocol revision announced when the caller asks for nothing we support.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2025-03-26";
/// Protocol revisions this crate can speak, newest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;
const MIN_SESSION_SECRET_BYTES: usize = 16;

pub const ENV_SERVER_NAME: &str = "TOOLMESH_SERVER_NAME";
pub const ENV_NAMESPACE_SEPARATOR: &str = "TOOLMESH_NAMESPACE_SEPARATOR";
pub const ENV_SEARCH_LIMIT: &str = "TOOLMESH_SEARCH_LIMIT";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "TOOLMESH_REQUEST_TIMEOUT_MS";
pub const ENV_SESSION_SECRET: &str = "TOOLMESH_SESSION_SECRET";
pub const ENV_SESSION_TTL_SECS: &str = "TOOLMESH_SESSION_TTL_SECS";

/// Signed session token settings.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    #[serde(default = "default_session_ttl_secs")]
    pub ttl_secs: u64,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &"..")
            .field("ttl_secs", &self.ttl_secs)
            .finish()
    }
}

fn default_session_ttl_secs() -> u64 {
    DEFAULT_SESSION_TTL_SECS
}

/// One remote endpoint to federate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingConfig {
    #[serde(default)]
    pub namespace: String,
    pub url: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default, skip_serializing)]
    pub bearer_token: Option<String>,
    #[serde(default)]
    pub bearer_token_env: Option<String>,
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub deny: Vec<String>,
}

impl BindingConfig {
    pub fn new(namespace: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            url: url.into(),
            visibility: Visibility::Native,
            bearer_token: None,
            bearer_token_env: None,
            allow: Vec::new(),
            deny: Vec::new(),
        }
    }

    /// Credential source: inline token first, then environment variable.
    pub fn auth_provider(&self) -> Arc<dyn AuthProvider> {
        match (&self.bearer_token, &self.bearer_token_env) {
            (Some(token), _) => Arc::new(StaticCredential::bearer(token.clone())),
            (None, Some(var)) => Arc::new(StaticCredential::from_env(var.clone())),
            (None, None) => Arc::new(NoAuth),
        }
    }

    /// Build the HTTP-backed binding this entry describes.
    pub fn build_binding(&self, config: &MeshConfig) -> FederationBinding {
        let client = FederationClient::new(self.url.clone())
            .with_auth(self.auth_provider())
            .with_timeout(config.request_timeout())
            .with_protocol_version(config.protocol_version.clone())
            .with_client_info(config.server_name.clone(), config.server_version.clone());

        let binding = FederationBinding::new(self.namespace.clone(), Arc::new(client))
            .with_visibility(self.visibility);
        if self.allow.is_empty() && self.deny.is_empty() {
            binding
        } else {
            binding.with_tool_filter(allow_deny_filter(&self.allow, &self.deny))
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    pub server_name: String,
    pub server_version: String,
    pub protocol_version: String,
    pub namespace_separator: String,
    pub default_search_limit: usize,
    pub request_timeout_ms: u64,
    pub session: Option<SessionConfig>,
    pub federation: Vec<BindingConfig>,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            server_name: env!("CARGO_PKG_NAME").to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            namespace_separator: DEFAULT_SEPARATOR.to_string(),
            default_search_limit: DEFAULT_MAX_RESULTS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            session: None,
            federation: Vec::new(),
        }
    }
}

impl MeshConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document; missing keys take their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, MeshError> {
        toml::from_str(raw).map_err(|e| MeshError::Configuration(format!("invalid config: {e}")))
    }

    /// Read and parse a TOML file.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, MeshError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw).map_err(|err| match err {
            MeshError::Configuration(message) => {
                MeshError::Configuration(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    /// Defaults overlaid with environment variables (`.env` is loaded if present).
    pub fn from_env() -> Result<Self, MeshError> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::default().with_env_overrides()
    }

    /// Full layering: optional TOML file, then environment, then validation.
    ///
    /// Callers apply code-level overrides to the returned value.
    pub fn load(path: Option<&Path>) -> Result<Self, MeshError> {
        let _ = dotenvy::dotenv();
        let base = match path {
            Some(path) => Self::load_from_path(path)?,
            None => Self::default(),
        };
        let config = base.with_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `TOOLMESH_*` environment variables on top of `self`.
    pub fn with_env_overrides(mut self) -> Result<Self, MeshError> {
        if let Some(name) = env_string(ENV_SERVER_NAME) {
            self.server_name = name;
        }
        if let Some(separator) = env_string(ENV_NAMESPACE_SEPARATOR) {
            self.namespace_separator = separator;
        }
        if let Some(limit) = env_parse::<usize>(ENV_SEARCH_LIMIT)? {
            self.default_search_limit = limit;
        }
        if let Some(timeout) = env_parse::<u64>(ENV_REQUEST_TIMEOUT_MS)? {
            self.request_timeout_ms = timeout;
        }
        if let Some(secret) = env_string(ENV_SESSION_SECRET) {
            let ttl_secs = self
                .session
                .as_ref()
                .map_or(DEFAULT_SESSION_TTL_SECS, |session| session.ttl_secs);
            self.session = Some(SessionConfig { secret, ttl_secs });
        }
        if let Some(ttl_secs) = env_parse::<u64>(ENV_SESSION_TTL_SECS)? {
            if let Some(session) = self.session.as_mut() {
                session.ttl_secs = ttl_secs;
            }
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), MeshError> {
        if self.namespace_separator.is_empty() {
            return Err(MeshError::Configuration(
                "namespace_separator must not be empty".into(),
            ));
        }
        if let Some(session) = &self.session {
            if session.secret.len() < MIN_SESSION_SECRET_BYTES {
                return Err(MeshError::Configuration(format!(
                    "session secret must be at least {MIN_SESSION_SECRET_BYTES} bytes"
                )));
            }
            if session.ttl_secs == 0 {
                return Err(MeshError::Configuration(
                    "session ttl_secs must be positive".into(),
                ));
            }
        }

        let mut namespaces = HashSet::new();
        for binding in &self.federation {
            if binding.url.trim().is_empty() {
                return Err(MeshError::Configuration(format!(
                    "federation binding '{}' has an empty url",
                    binding.namespace
                )));
            }
            if !namespaces.insert(binding.namespace.as_str()) {
                return Err(MeshError::Configuration(format!(
                    "duplicate federation namespace '{}'",
                    binding.namespace
                )));
            }
        }
        Ok(())
    }

    /// Default search result cap, clamped into the accepted range.
    pub fn search_limit(&self) -> usize {
        clamp_max_results(None, self.default_search_limit)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn with_session(mut self, secret: impl Into<String>, ttl_secs: u64) -> Self {
        self.session = Some(SessionConfig {
            secret: secret.into(),
            ttl_secs,
        });
        self
    }

    pub fn with_binding(mut self, binding: BindingConfig) -> Self {
        self.federation.push(binding);
        self
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>, MeshError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env_string(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| MeshError::Configuration(format!("{key}={raw}: {e}")))
        })
        .transpose()
}
