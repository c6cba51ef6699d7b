//! Session persistence contract and the HMAC-signed token implementation.
//!
//! A token is `base64url(claims_json) "." base64url(hmac_sha256(payload))`.
//! Validation recomputes the MAC and checks the embedded expiry; there is no
//! server-side state, so a token cannot be revoked before it expires.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::discovery::ListingMode;
use crate::error::MeshError;

type HmacSha256 = Hmac<Sha256>;

/// What a session token carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    #[serde(rename = "v")]
    pub version: String,
    #[serde(rename = "m")]
    pub mode: ListingMode,
    #[serde(rename = "iat")]
    pub issued_at: i64,
    #[serde(rename = "exp")]
    pub expires_at: i64,
}

/// Result of validating a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionValidation {
    pub valid: bool,
    pub mode: ListingMode,
    pub version: Option<String>,
}

impl SessionValidation {
    pub fn invalid() -> Self {
        Self {
            valid: false,
            mode: ListingMode::Default,
            version: None,
        }
    }
}

/// Session store consumed by the dispatch core.
pub trait SessionStore: Send + Sync {
    /// Issue an opaque token for a newly established session.
    fn issue(&self, version: &str, mode: ListingMode) -> Result<String, MeshError>;

    /// Check a token presented on a later request.
    fn validate(&self, token: &str) -> SessionValidation;
}

/// Stateless store that signs claims with HMAC-SHA256.
pub struct SignedSessionStore {
    key: Vec<u8>,
    ttl: Duration,
}

impl std::fmt::Debug for SignedSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedSessionStore")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SignedSessionStore {
    pub fn new(secret: impl AsRef<[u8]>, ttl_secs: u64) -> Result<Self, MeshError> {
        let key = secret.as_ref().to_vec();
        if key.is_empty() {
            return Err(MeshError::Configuration("session secret must not be empty".into()));
        }
        let ttl_secs = i64::try_from(ttl_secs)
            .map_err(|_| MeshError::Configuration("session ttl out of range".into()))?;
        Ok(Self {
            key,
            ttl: Duration::seconds(ttl_secs),
        })
    }

    fn mac(&self) -> Result<HmacSha256, MeshError> {
        HmacSha256::new_from_slice(&self.key)
            .map_err(|e| MeshError::Session(format!("invalid session key: {e}")))
    }

    pub fn issue_at(
        &self,
        version: &str,
        mode: ListingMode,
        now: DateTime<Utc>,
    ) -> Result<String, MeshError> {
        let claims = SessionClaims {
            version: version.to_string(),
            mode,
            issued_at: now.timestamp(),
            expires_at: (now + self.ttl).timestamp(),
        };
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!("{payload}.{signature}"))
    }

    /// Decode and verify a token, returning its claims when valid at `now`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, MeshError> {
        let (payload, signature) = token
            .split_once('.')
            .ok_or_else(|| MeshError::Session("malformed session token".into()))?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| MeshError::Session("malformed session signature".into()))?;

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| MeshError::Session("session signature mismatch".into()))?;

        let raw = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| MeshError::Session("malformed session payload".into()))?;
        let claims: SessionClaims = serde_json::from_slice(&raw)?;
        if claims.expires_at <= now.timestamp() {
            return Err(MeshError::Session("session expired".into()));
        }
        Ok(claims)
    }

    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> SessionValidation {
        match self.verify_at(token, now) {
            Ok(claims) => SessionValidation {
                valid: true,
                mode: claims.mode,
                version: Some(claims.version),
            },
            Err(error) => {
                tracing::debug!(%error, "rejected session token");
                SessionValidation::invalid()
            }
        }
    }
}

impl SessionStore for SignedSessionStore {
    fn issue(&self, version: &str, mode: ListingMode) -> Result<String, MeshError> {
        self.issue_at(version, mode, Utc::now())
    }

    fn validate(&self, token: &str) -> SessionValidation {
        self.validate_at(token, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SignedSessionStore {
        SignedSessionStore::new("0123456789abcdef-secret", 3600).unwrap()
    }

    #[test]
    fn issued_token_round_trips_mode_and_version() {
        let store = store();
        let token = store.issue("2025-03-26", ListingMode::ShowAll).unwrap();

        let validation = store.validate(&token);
        assert!(validation.valid);
        assert_eq!(validation.mode, ListingMode::ShowAll);
        assert_eq!(validation.version.as_deref(), Some("2025-03-26"));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let store = store();
        let token = store.issue("2025-03-26", ListingMode::Default).unwrap();
        let (_, signature) = token.split_once('.').unwrap();

        let forged_claims = SessionClaims {
            version: "2025-03-26".into(),
            mode: ListingMode::ShowAll,
            issued_at: 0,
            expires_at: i64::MAX,
        };
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap());
        let forged = format!("{forged_payload}.{signature}");

        assert_eq!(store.validate(&forged), SessionValidation::invalid());
    }

    #[test]
    fn token_from_another_key_is_rejected() {
        let other = SignedSessionStore::new("another-secret-entirely!", 3600).unwrap();
        let token = other.issue("2025-03-26", ListingMode::ShowAll).unwrap();
        assert!(!store().validate(&token).valid);
    }

    #[test]
    fn expired_token_is_rejected() {
        let store = store();
        let issued = Utc::now() - Duration::hours(2);
        let token = store.issue_at("2025-03-26", ListingMode::ShowAll, issued).unwrap();

        assert!(!store.validate(&token).valid);
        assert!(store.validate_at(&token, issued + Duration::minutes(5)).valid);
    }

    #[test]
    fn garbage_is_rejected() {
        let store = store();
        for token in ["", "no-dot", "a.b", "!!!.???"] {
            assert!(!store.validate(token).valid, "{token}");
        }
    }
}
