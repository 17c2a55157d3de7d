//! CSRF token service
//!
//! Issues one token per session and validates it on state-changing requests.
//! Tokens are secrets: comparison uses a constant-time scheme so a mismatch
//! leaks no timing information about how much of the token matched.
//!
//! Tokens are:
//! - Cryptographically secure (32 bytes of randomness, base64url-encoded)
//! - Bound to a session (one live token per session id)
//! - Stable until explicitly regenerated (repeated fetches return the same
//!   token, so a page and its API calls agree on the value)
//! - Dropped with the session

use std::collections::HashMap;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use parking_lot::RwLock;
use rand::Rng;

use crate::session::SessionId;

/// Header carrying the CSRF token on mutating requests
pub const CSRF_HEADER_NAME: &str = "x-csrf-token";

/// CSRF token string (base64url-encoded 32-byte random value)
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CsrfToken(String);

impl CsrfToken {
    /// Generate a new cryptographically secure CSRF token
    #[must_use]
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; 32];
        rng.fill(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Get the token as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Create a token from a string (for validation of submitted values)
    #[must_use]
    pub const fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for CsrfToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Constant-time byte comparison
///
/// Folds the XOR of every byte pair so the loop runs to completion on
/// mismatches. Length is checked up front; lengths are not secret here.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Per-session CSRF token registry
///
/// `get_or_create` is idempotent: repeated calls for one session return the
/// same token until [`CsrfService::regenerate`] or [`CsrfService::remove`]
/// is called. Successful validation does not rotate the token.
#[derive(Debug, Default)]
pub struct CsrfService {
    tokens: RwLock<HashMap<SessionId, CsrfToken>>,
}

impl CsrfService {
    /// Create an empty service
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the session's token, creating one on first use
    #[must_use]
    pub fn get_or_create(&self, session_id: &SessionId) -> CsrfToken {
        if let Some(token) = self.tokens.read().get(session_id) {
            return token.clone();
        }
        let mut tokens = self.tokens.write();
        // A concurrent request may have created one between the locks.
        tokens
            .entry(session_id.clone())
            .or_insert_with(CsrfToken::generate)
            .clone()
    }

    /// Validate a submitted token against the session-bound one
    ///
    /// Returns `false` when the session has no token or the values differ.
    /// Comparison is constant-time.
    #[must_use]
    pub fn validate(&self, session_id: &SessionId, submitted: &CsrfToken) -> bool {
        self.tokens.read().get(session_id).is_some_and(|bound| {
            constant_time_eq(bound.as_str().as_bytes(), submitted.as_str().as_bytes())
        })
    }

    /// Replace the session's token with a fresh one
    #[must_use]
    pub fn regenerate(&self, session_id: &SessionId) -> CsrfToken {
        let token = CsrfToken::generate();
        self.tokens.write().insert(session_id.clone(), token.clone());
        token
    }

    /// Drop the session's token (called when the session is destroyed)
    pub fn remove(&self, session_id: &SessionId) {
        self.tokens.write().remove(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_differ() {
        assert_ne!(CsrfToken::generate(), CsrfToken::generate());
    }

    #[test]
    fn constant_time_eq_matches() {
        let a = [1u8, 2, 3, 4];
        let b = [1u8, 2, 3, 4];
        let c = [1u8, 2, 3, 5];
        assert!(constant_time_eq(&a, &b));
        assert!(!constant_time_eq(&a, &c));
        assert!(!constant_time_eq(&a, &a[..3]));
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let service = CsrfService::new();
        let id = SessionId::generate();
        let first = service.get_or_create(&id);
        let second = service.get_or_create(&id);
        assert_eq!(first, second);
    }

    #[test]
    fn validate_accepts_bound_token() {
        let service = CsrfService::new();
        let id = SessionId::generate();
        let token = service.get_or_create(&id);
        assert!(service.validate(&id, &token));
        // Validation does not rotate: the token stays valid.
        assert!(service.validate(&id, &token));
    }

    #[test]
    fn validate_rejects_foreign_token() {
        let service = CsrfService::new();
        let session_a = SessionId::generate();
        let session_b = SessionId::generate();
        let _ = service.get_or_create(&session_a);
        let token_b = service.get_or_create(&session_b);
        assert!(!service.validate(&session_a, &token_b));
    }

    #[test]
    fn validate_rejects_unknown_session() {
        let service = CsrfService::new();
        let token = CsrfToken::generate();
        assert!(!service.validate(&SessionId::generate(), &token));
    }

    #[test]
    fn regenerate_invalidates_old_token() {
        let service = CsrfService::new();
        let id = SessionId::generate();
        let old = service.get_or_create(&id);
        let new = service.regenerate(&id);
        assert_ne!(old, new);
        assert!(!service.validate(&id, &old));
        assert!(service.validate(&id, &new));
    }

    #[test]
    fn remove_drops_token() {
        let service = CsrfService::new();
        let id = SessionId::generate();
        let token = service.get_or_create(&id);
        service.remove(&id);
        assert!(!service.validate(&id, &token));
    }
}
