//! Router assembly
//!
//! Wires the gatekeeper endpoints, the static asset mounts, and the
//! application's own API routes behind the pipeline. Layer order is the
//! pipeline contract: requests pass the session layer, then the CSRF
//! guard, then the gate, and only an `Allow` outcome reaches a handler,
//! including the static services and the catch-all.

use axum::routing::{any, get};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::{CsrfLayer, GateLayer, SessionLayer};
use crate::state::GatehouseState;

/// Build the full gatekeeper router with no application API routes
#[must_use]
pub fn build(state: GatehouseState) -> Router {
    build_with_api(state, Router::new())
}

/// Build the full gatekeeper router, nesting `api` under `/api`
///
/// The application's API routes share the pipeline: anything under `/api`
/// other than `/api/login` requires an authenticated session, and every
/// mutating request requires a valid CSRF token.
#[must_use]
pub fn build_with_api(state: GatehouseState, api: Router<GatehouseState>) -> Router {
    let assets = state.config().assets.clone();

    let api = api
        .route("/login", axum::routing::post(handlers::api_login))
        .fallback(handlers::api_fallback);

    Router::new()
        .route("/csrf-token", get(handlers::csrf_token))
        .route("/login", any(handlers::login_page))
        .route("/login/{*rest}", any(handlers::login_page))
        .route("/logout", get(handlers::logout))
        .nest("/api", api)
        .nest_service(assets.public_prefix.as_str(), ServeDir::new(&assets.public_dir))
        .nest_service(
            assets.protected_prefix.as_str(),
            ServeDir::new(&assets.protected_dir),
        )
        .fallback(handlers::app_fallback)
        // Innermost first: the gate sees requests last, so the session and
        // CSRF layers have already run when it decides.
        .layer(GateLayer::new(&state))
        .layer(CsrfLayer::new(&state))
        .layer(SessionLayer::new(&state))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
