//! Credential sources for outbound federation requests.
//!
//! Each federation binding holds one [`AuthProvider`]. The client asks it for
//! an `Authorization` header before every remote request, and calls
//! [`AuthProvider::refresh`] once when the remote rejects the credential.

pub mod credential;
pub mod token;

use async_trait::async_trait;

use crate::error::MeshError;

pub use credential::{AuthValue, StaticCredential};
pub use token::{RefreshingCredential, Token, TokenSource};

/// Authentication collaborator for one remote endpoint.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Full `Authorization` header value, or `None` to send no header.
    async fn auth_header(&self) -> Result<Option<String>, MeshError>;

    /// Discard cached credentials so the next `auth_header` fetches fresh ones.
    async fn refresh(&self) -> Result<(), MeshError>;
}

/// Sends no credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

#[async_trait]
impl AuthProvider for NoAuth {
    async fn auth_header(&self) -> Result<Option<String>, MeshError> {
        Ok(None)
    }

    async fn refresh(&self) -> Result<(), MeshError> {
        Ok(())
    }
}
