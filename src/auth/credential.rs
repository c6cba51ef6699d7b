//! Static credentials: inline secrets or environment variables.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::AuthProvider;
use crate::error::MeshError;

/// An authentication value (API key, token, etc.).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AuthValue {
    /// Sent verbatim as the header value.
    ApiKey(String),
    /// Sent as `Bearer <token>`.
    BearerToken(String),
    /// Environment variable holding a bearer token, read at resolve time.
    EnvVar(String),
}

impl AuthValue {
    /// Resolve to the actual secret string.
    pub fn resolve(&self) -> Result<String, MeshError> {
        match self {
            Self::ApiKey(k) => Ok(k.clone()),
            Self::BearerToken(t) => Ok(t.clone()),
            Self::EnvVar(var) => std::env::var(var).map_err(|_| {
                MeshError::Authentication(format!("Environment variable {var} not set"))
            }),
        }
    }

    /// Resolve to an `Authorization` header value.
    pub fn header_value(&self) -> Result<String, MeshError> {
        let secret = self.resolve()?;
        Ok(match self {
            Self::ApiKey(_) => secret,
            Self::BearerToken(_) | Self::EnvVar(_) => format!("Bearer {secret}"),
        })
    }
}

/// [`AuthProvider`] backed by a single [`AuthValue`].
///
/// The resolved header is cached; `refresh` re-resolves, which picks up a
/// rotated environment variable.
#[derive(Debug)]
pub struct StaticCredential {
    value: AuthValue,
    cached: RwLock<Option<String>>,
}

impl StaticCredential {
    pub fn new(value: AuthValue) -> Self {
        Self {
            value,
            cached: RwLock::new(None),
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self::new(AuthValue::BearerToken(token.into()))
    }

    pub fn from_env(var: impl Into<String>) -> Self {
        Self::new(AuthValue::EnvVar(var.into()))
    }
}

#[async_trait]
impl AuthProvider for StaticCredential {
    async fn auth_header(&self) -> Result<Option<String>, MeshError> {
        if let Some(header) = self
            .cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Ok(Some(header));
        }
        let header = self.value.header_value()?;
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = Some(header.clone());
        Ok(Some(header))
    }

    async fn refresh(&self) -> Result<(), MeshError> {
        let header = self.value.header_value()?;
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = Some(header);
        Ok(())
    }
}
