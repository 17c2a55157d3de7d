//! Login collaborator seam
//!
//! Credential verification lives behind [`LoginService`]; the pipeline only
//! gates the login endpoint and flips the session's `authenticated` flag on
//! success. Password hashing, user databases, and federation belong to the
//! application behind this trait.

use async_trait::async_trait;
use serde::Deserialize;

use crate::csrf::constant_time_eq;
use crate::error::GatehouseError;

/// Credentials submitted to `POST /api/login`
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    /// Account name
    pub username: String,
    /// Plaintext password, verified by the [`LoginService`]
    pub password: String,
}

/// Capability interface for credential verification
#[async_trait]
pub trait LoginService: Send + Sync {
    /// Verify credentials; `Ok(true)` marks the session authenticated
    ///
    /// # Errors
    ///
    /// Backend failures (user database down, upstream IdP unreachable)
    /// surface as [`GatehouseError`] and render as a server error, never as
    /// a silent rejection.
    async fn verify(&self, credentials: &Credentials) -> Result<bool, GatehouseError>;
}

/// Fixed-credential login service
///
/// Accepts exactly one username/password pair, compared in constant time.
/// Meant for demos and tests; production deployments implement
/// [`LoginService`] over their own user store.
#[derive(Debug, Clone)]
pub struct FixedCredentials {
    username: String,
    password: String,
}

impl FixedCredentials {
    /// Build a service accepting the given pair
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[async_trait]
impl LoginService for FixedCredentials {
    async fn verify(&self, credentials: &Credentials) -> Result<bool, GatehouseError> {
        let user_ok = constant_time_eq(
            self.username.as_bytes(),
            credentials.username.as_bytes(),
        );
        let pass_ok = constant_time_eq(
            self.password.as_bytes(),
            credentials.password.as_bytes(),
        );
        Ok(user_ok && pass_ok)
    }
}
