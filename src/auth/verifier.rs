//! Bearer-token verification for inbound WebSocket connections.
//!
//! The shipped verifier validates tokens against a static list loaded from
//! config at startup. When auth is disabled it admits every connection with
//! a deterministic guest identity. Validation happens before the WebSocket
//! upgrade completes, so a rejected connection never touches session state.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use subtle::ConstantTimeEq;

use super::error::AuthError;
use crate::config::AuthTokenEntry;
use crate::protocol::UserId;

/// Validated identity attached to an admitted session.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: UserId,
    pub email: Option<String>,
}

/// Capability to turn a presented bearer token into a validated identity.
///
/// Implementations must fail closed: any doubt about the token is an
/// `AuthError`, never a degraded identity.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: Option<&str>) -> Result<Identity, AuthError>;
}

/// Constant-time token comparison to prevent timing attacks.
pub(crate) fn tokens_match(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Derive a stable guest user id from token material using SHA-256, so the
/// same token maps to the same guest across reconnects when auth is off.
fn guest_user_id(token: &str) -> UserId {
    let hash = Sha256::digest(token.as_bytes());
    let mut hex = String::with_capacity(16);
    for byte in &hash[..8] {
        hex.push_str(&format!("{byte:02x}"));
    }
    format!("guest_{hex}")
}

/// In-memory verifier backed by a static token table from config.
pub struct StaticTokenVerifier {
    /// Map of token -> identity. Empty when auth is disabled.
    tokens: HashMap<String, Identity>,
    /// Whether token validation is enforced.
    auth_enabled: bool,
}

impl StaticTokenVerifier {
    /// Build a verifier from configured token entries.
    pub fn new(entries: Vec<AuthTokenEntry>) -> Self {
        let mut tokens = HashMap::with_capacity(entries.len());
        for entry in entries {
            tokens.insert(
                entry.token,
                Identity {
                    user_id: entry.user_id,
                    email: entry.email,
                },
            );
        }
        Self {
            tokens,
            auth_enabled: true,
        }
    }

    /// Verifier that admits every connection with a guest identity.
    pub fn disabled() -> Self {
        Self {
            tokens: HashMap::new(),
            auth_enabled: false,
        }
    }
}

#[async_trait]
impl IdentityVerifier for StaticTokenVerifier {
    async fn verify(&self, token: Option<&str>) -> Result<Identity, AuthError> {
        if !self.auth_enabled {
            let seed = token.map_or_else(|| uuid::Uuid::new_v4().to_string(), str::to_owned);
            return Ok(Identity {
                user_id: guest_user_id(&seed),
                email: None,
            });
        }

        let token = token.ok_or(AuthError::MissingToken)?;
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        // Scan the whole table even after a hit so lookup time does not leak
        // which prefix matched.
        let mut found: Option<&Identity> = None;
        for (candidate, identity) in &self.tokens {
            if tokens_match(candidate, token) {
                found = Some(identity);
            }
        }

        found.cloned().ok_or(AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(token: &str, user_id: &str) -> AuthTokenEntry {
        AuthTokenEntry {
            token: token.to_string(),
            user_id: user_id.to_string(),
            email: Some(format!("{user_id}@example.com")),
        }
    }

    #[tokio::test]
    async fn test_valid_token_yields_identity() {
        let verifier = StaticTokenVerifier::new(vec![entry("tok-abc", "uid-1")]);
        let identity = verifier.verify(Some("tok-abc")).await.unwrap();
        assert_eq!(identity.user_id, "uid-1");
        assert_eq!(identity.email.as_deref(), Some("uid-1@example.com"));
    }

    #[tokio::test]
    async fn test_missing_token_is_rejected() {
        let verifier = StaticTokenVerifier::new(vec![entry("tok-abc", "uid-1")]);
        assert!(matches!(
            verifier.verify(None).await,
            Err(AuthError::MissingToken)
        ));
        assert!(matches!(
            verifier.verify(Some("")).await,
            Err(AuthError::MissingToken)
        ));
    }

    #[tokio::test]
    async fn test_unknown_token_is_rejected() {
        let verifier = StaticTokenVerifier::new(vec![entry("tok-abc", "uid-1")]);
        assert!(matches!(
            verifier.verify(Some("tok-xyz")).await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_disabled_verifier_admits_guests_deterministically() {
        let verifier = StaticTokenVerifier::disabled();
        let first = verifier.verify(Some("anything")).await.unwrap();
        let second = verifier.verify(Some("anything")).await.unwrap();
        assert_eq!(first.user_id, second.user_id);
        assert!(first.user_id.starts_with("guest_"));

        let anonymous = verifier.verify(None).await.unwrap();
        assert!(anonymous.user_id.starts_with("guest_"));
    }
}
