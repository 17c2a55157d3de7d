//! Gate middleware
//!
//! The dispatcher of the decision pipeline: every request (pages, API,
//! static assets, the catch-all) passes through here, and exactly one
//! [`Outcome`] is produced before any handler runs. Fail-closed: a request
//! only reaches its handler on `Allow`.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::Request;
use axum::response::Response;
use http::header::LOCATION;
use http::StatusCode;
use tower::{Layer, Service};

use crate::error::{json_error, render_error};
use crate::gate::{Gate, Outcome};
use crate::routes::LOGIN_PATH;
use crate::session::Session;
use crate::state::GatehouseState;

/// Layer inserting [`GateMiddleware`] into a service stack
///
/// Must sit inside the session and CSRF layers.
#[derive(Clone, Debug)]
pub struct GateLayer {
    gate: Arc<Gate>,
}

impl GateLayer {
    /// Create a gate layer from application state
    #[must_use]
    pub fn new(state: &GatehouseState) -> Self {
        Self {
            gate: Arc::clone(state.gate()),
        }
    }

    /// Create a gate layer over an explicit gate
    #[must_use]
    pub fn with_gate(gate: Arc<Gate>) -> Self {
        Self { gate }
    }
}

impl<S> Layer<S> for GateLayer {
    type Service = GateMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        GateMiddleware {
            inner,
            gate: Arc::clone(&self.gate),
        }
    }
}

/// Middleware applying the authorization gate to every request
#[derive(Clone, Debug)]
pub struct GateMiddleware<S> {
    inner: S,
    gate: Arc<Gate>,
}

impl<S> Service<Request> for GateMiddleware<S>
where
    S: Service<Request, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let gate = Arc::clone(&self.gate);
        let mut inner = self.inner.clone();

        let authenticated = req
            .extensions()
            .get::<Session>()
            .is_some_and(Session::authenticated);
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let outcome = gate.decide(authenticated, &method, &path);
        tracing::debug!(%method, %path, authenticated, ?outcome, "gate decision");

        match outcome {
            Outcome::Allow(class) => {
                req.extensions_mut().insert(class);
                Box::pin(inner.call(req))
            }
            other => Box::pin(async move { Ok(outcome_response(other, &method, &path)) }),
        }
    }
}

/// Render a non-`Allow` outcome into an HTTP response
#[must_use]
pub fn outcome_response(outcome: Outcome, method: &http::Method, path: &str) -> Response<Body> {
    match outcome {
        Outcome::Allow(_) => {
            // Allow is dispatched, not rendered; treat as a wiring bug.
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
                "allow outcome reached the responder",
            )
        }
        Outcome::RedirectToLogin => redirect_to_login(),
        Outcome::RejectUnauthorized => json_error(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "authentication required",
        ),
        Outcome::RejectCsrfInvalid => {
            json_error(StatusCode::FORBIDDEN, "csrf_invalid", "CSRF token invalid")
        }
        Outcome::RejectServerError(status) => {
            render_error(status, "server_error", "internal error", method, path)
        }
    }
}

/// 302 redirect to the login page
///
/// Deliberately 302 Found rather than axum's 303: plain browser
/// navigations are being re-pointed, and 302 is the observable contract.
#[must_use]
pub fn redirect_to_login() -> Response<Body> {
    Response::builder()
        .status(StatusCode::FOUND)
        .header(LOCATION, LOGIN_PATH)
        .body(Body::empty())
        .unwrap_or_else(|_| {
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
                "redirect construction failed",
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SessionData, SessionId};
    use axum::routing::get;
    use axum::Router;
    use http::Method;
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/dashboard", get(|| async { "dashboard" }))
            .route("/login", get(|| async { "login" }))
            .fallback(|| async { "app" })
            .layer(GateLayer::with_gate(Arc::new(Gate::default())))
    }

    fn authenticated_session() -> Session {
        let mut data = SessionData::new(chrono::Duration::hours(1));
        data.authenticated = true;
        Session::new(SessionId::generate(), Some(data), false)
    }

    #[tokio::test]
    async fn unauthenticated_page_get_redirects_with_302() {
        let request = Request::builder()
            .uri("/dashboard")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers().get(LOCATION).unwrap(), LOGIN_PATH);
    }

    #[tokio::test]
    async fn unauthenticated_api_get_is_401() {
        let request = Request::builder()
            .uri("/api/me")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unauthenticated_mutation_is_401() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/dashboard")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn login_page_passes_without_session() {
        let request = Request::builder()
            .uri("/login")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn authenticated_request_reaches_handler() {
        let request = Request::builder()
            .uri("/dashboard")
            .extension(authenticated_session())
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn no_session_extension_fails_closed() {
        // Without the session layer the gate still treats the request as
        // unauthenticated rather than letting it through.
        let request = Request::builder()
            .uri("/secret")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
    }

    #[test]
    fn outcome_rendering_matches_taxonomy() {
        let method = Method::POST;
        let unauthorized = outcome_response(Outcome::RejectUnauthorized, &method, "/x");
        assert_eq!(unauthorized.status(), StatusCode::UNAUTHORIZED);

        let csrf = outcome_response(Outcome::RejectCsrfInvalid, &method, "/x");
        assert_eq!(csrf.status(), StatusCode::FORBIDDEN);

        let server = outcome_response(
            Outcome::RejectServerError(StatusCode::INTERNAL_SERVER_ERROR),
            &method,
            "/x",
        );
        assert_eq!(server.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
