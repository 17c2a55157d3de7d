//! Authorization gate
//!
//! The decision pipeline's core: combines session state, HTTP method, and
//! route classification into exactly one [`Outcome`] per request. The gate
//! is pure and stateless; it never errors on well-formed input, and an
//! absent or expired session is simply `authenticated == false`.

use http::{Method, StatusCode};

use crate::routes::{RouteClass, RouteTable};

/// The single decision value produced per request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Serve the resource; carries the route class for the responder
    Allow(RouteClass),
    /// Redirect a plain browser navigation to the login page
    RedirectToLogin,
    /// Reject with 401 (API callers and mutating requests)
    RejectUnauthorized,
    /// Reject with 403 (CSRF token missing or mismatched)
    RejectCsrfInvalid,
    /// Reject with a server-side error status
    RejectServerError(StatusCode),
}

/// The authorization gate
///
/// Owns the route table and applies the access algorithm:
/// public classes pass unconditionally; authenticated sessions pass
/// everywhere; unauthenticated requests to protected routes get a login
/// redirect only when they are plain browser navigations (GET, non-API).
/// Programmatic and mutating requests get a machine-readable 401, because a
/// redirect is meaningless to an API caller and dangerous for
/// non-idempotent methods.
#[derive(Debug, Clone)]
pub struct Gate {
    routes: RouteTable,
}

impl Gate {
    /// Build a gate over the given rule table
    #[must_use]
    pub const fn new(routes: RouteTable) -> Self {
        Self { routes }
    }

    /// The route table this gate consults
    #[must_use]
    pub const fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Decide the outcome for one request
    #[must_use]
    pub fn decide(&self, authenticated: bool, method: &Method, path: &str) -> Outcome {
        let class = self.routes.classify(method, path);
        if !class.requires_auth() {
            return Outcome::Allow(class);
        }
        if authenticated {
            return Outcome::Allow(class);
        }
        if method != Method::GET || class.is_api() {
            Outcome::RejectUnauthorized
        } else {
            Outcome::RedirectToLogin
        }
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new(RouteTable::default())
    }
}
