use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::AuthProvider;
use crate::error::MeshError;

/// Access token with an optional expiry.
///
/// # Example
/// ```
/// use toolmesh::auth::Token;
/// use chrono::{Duration, Utc};
///
/// let token = Token {
///     access_token: "access".to_string(),
///     expires_at: Some(Utc::now() + Duration::minutes(5)),
/// };
/// assert!(!token.is_expired(Utc::now()));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Tokens within this window of expiry are treated as expired.
const EXPIRY_SKEW_SECS: i64 = 30;

impl Token {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|expires_at| now + Duration::seconds(EXPIRY_SKEW_SECS) >= expires_at)
    }
}

/// Something that can mint a fresh token (OAuth exchange, metadata service, ...).
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch_token(&self) -> Result<Token, MeshError>;
}

/// [`AuthProvider`] that caches a [`Token`] and re-fetches it on expiry or refresh.
pub struct RefreshingCredential {
    source: Arc<dyn TokenSource>,
    current: Mutex<Option<Token>>,
}

impl RefreshingCredential {
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        Self {
            source,
            current: Mutex::new(None),
        }
    }
}

#[async_trait]
impl AuthProvider for RefreshingCredential {
    async fn auth_header(&self) -> Result<Option<String>, MeshError> {
        let mut current = self.current.lock().await;
        let token = match current.as_ref() {
            Some(token) if !token.is_expired(Utc::now()) => token.clone(),
            _ => {
                tracing::debug!("fetching federation access token");
                let token = self.source.fetch_token().await?;
                *current = Some(token.clone());
                token
            }
        };
        Ok(Some(format!("Bearer {}", token.access_token)))
    }

    async fn refresh(&self) -> Result<(), MeshError> {
        let token = self.source.fetch_token().await?;
        *self.current.lock().await = Some(token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        fetches: AtomicUsize,
        ttl: Option<Duration>,
    }

    #[async_trait]
    impl TokenSource for CountingSource {
        async fn fetch_token(&self) -> Result<Token, MeshError> {
            let n = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(Token {
                access_token: format!("token-{n}"),
                expires_at: self.ttl.map(|ttl| Utc::now() + ttl),
            })
        }
    }

    #[test]
    fn expiry_honours_skew() {
        let now = Utc::now();
        let token = Token {
            access_token: "a".into(),
            expires_at: Some(now + Duration::seconds(10)),
        };
        assert!(token.is_expired(now));

        let token = Token {
            access_token: "a".into(),
            expires_at: None,
        };
        assert!(!token.is_expired(now));
    }

    #[tokio::test]
    async fn caches_until_refresh() {
        let source = Arc::new(CountingSource {
            fetches: AtomicUsize::new(0),
            ttl: Some(Duration::hours(1)),
        });
        let credential = RefreshingCredential::new(source.clone());

        assert_eq!(
            credential.auth_header().await.unwrap().as_deref(),
            Some("Bearer token-1")
        );
        assert_eq!(
            credential.auth_header().await.unwrap().as_deref(),
            Some("Bearer token-1")
        );
        credential.refresh().await.unwrap();
        assert_eq!(
            credential.auth_header().await.unwrap().as_deref(),
            Some("Bearer token-2")
        );
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn expired_token_is_refetched() {
        let source = Arc::new(CountingSource {
            fetches: AtomicUsize::new(0),
            ttl: Some(Duration::seconds(1)),
        });
        let credential = RefreshingCredential::new(source.clone());

        credential.auth_header().await.unwrap();
        credential.auth_header().await.unwrap();
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }
}
