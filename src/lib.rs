//! gatehouse: a session-aware request gatekeeper for axum applications
//!
//! For every incoming HTTP request, gatehouse produces exactly one decision:
//! serve a public resource, serve a protected resource, redirect the browser
//! to the login page, or reject with an error status. The decision pipeline
//! is an explicit, ordered sequence of stages rather than implicit
//! middleware registration order:
//!
//! 1. **Session layer**: cookie to session record (lazily created, rolling
//!    renewal, idle timeout)
//! 2. **CSRF guard**: constant-time token validation on state-changing
//!    requests, ahead of any auth decision
//! 3. **Authorization gate**: route classification (first-match-wins rule
//!    table) combined with session state into an [`gate::Outcome`]
//!
//! Browsers performing plain navigations are redirected to a human-friendly
//! login page; API callers and mutating requests get machine-readable
//! errors, never redirects.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use gatehouse::auth::FixedCredentials;
//! use gatehouse::config::GatehouseConfig;
//! use gatehouse::session::MemorySessionStore;
//! use gatehouse::state::GatehouseState;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     gatehouse::observability::init()?;
//!     let config = GatehouseConfig::load()?;
//!
//!     let state = GatehouseState::new(
//!         config,
//!         Arc::new(MemorySessionStore::new()),
//!         Arc::new(FixedCredentials::new("admin", "change-me")),
//!     );
//!
//!     let app = gatehouse::router::build(state);
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod csrf;
pub mod error;
pub mod extractors;
pub mod gate;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod router;
pub mod routes;
pub mod session;
pub mod state;
pub mod views;

pub mod prelude {
    //! Convenience re-exports for common types

    pub use crate::auth::{Credentials, FixedCredentials, LoginService};
    pub use crate::config::GatehouseConfig;
    pub use crate::csrf::{CsrfService, CsrfToken, CSRF_HEADER_NAME};
    pub use crate::error::GatehouseError;
    pub use crate::extractors::CsrfTokenExtractor;
    pub use crate::gate::{Gate, Outcome};
    pub use crate::middleware::{CsrfLayer, GateLayer, SessionLayer};
    pub use crate::routes::{RouteClass, RouteTable, LOGIN_PATH};
    pub use crate::session::{
        MemorySessionStore, Session, SessionData, SessionError, SessionId, SessionStore,
    };
    pub use crate::state::GatehouseState;
}
