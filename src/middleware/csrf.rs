//! CSRF middleware
//!
//! Validates the session-bound token on state-changing requests (POST, PUT,
//! DELETE, PATCH) ahead of the authorization gate: an invalid token blocks
//! even an authenticated, otherwise-permitted request. Safe methods and
//! configured skip paths pass through untouched.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::Request;
use axum::response::Response;
use http::{Method, StatusCode};
use tower::{Layer, Service};

use crate::config::CsrfSettings;
use crate::csrf::{CsrfService, CsrfToken};
use crate::error::json_error;
use crate::session::Session;
use crate::state::GatehouseState;

/// Layer inserting [`CsrfMiddleware`] into a service stack
///
/// Must sit inside the session layer: validation needs the [`Session`]
/// extension.
#[derive(Clone)]
pub struct CsrfLayer {
    settings: CsrfSettings,
    csrf: Arc<CsrfService>,
}

impl std::fmt::Debug for CsrfLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrfLayer")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl CsrfLayer {
    /// Create a CSRF layer from application state
    #[must_use]
    pub fn new(state: &GatehouseState) -> Self {
        Self {
            settings: state.config().csrf.clone(),
            csrf: Arc::clone(state.csrf()),
        }
    }

    /// Create a CSRF layer with explicit settings and service
    #[must_use]
    pub fn with_settings(settings: CsrfSettings, csrf: Arc<CsrfService>) -> Self {
        Self { settings, csrf }
    }
}

impl<S> Layer<S> for CsrfLayer {
    type Service = CsrfMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CsrfMiddleware {
            inner,
            settings: Arc::new(self.settings.clone()),
            csrf: Arc::clone(&self.csrf),
        }
    }
}

/// Middleware validating CSRF tokens on state-changing requests
#[derive(Clone)]
pub struct CsrfMiddleware<S> {
    inner: S,
    settings: Arc<CsrfSettings>,
    csrf: Arc<CsrfService>,
}

impl<S: std::fmt::Debug> std::fmt::Debug for CsrfMiddleware<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrfMiddleware")
            .field("inner", &self.inner)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl<S> Service<Request> for CsrfMiddleware<S>
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

    fn call(&mut self, req: Request) -> Self::Future {
        let settings = Arc::clone(&self.settings);
        let csrf = Arc::clone(&self.csrf);
        let mut inner = self.inner.clone();

        // Safe methods carry no state change to forge.
        if is_method_safe(req.method()) {
            return Box::pin(inner.call(req));
        }

        let path = req.uri().path().to_string();
        if settings.skip_paths.iter().any(|skip| skip == &path) {
            return Box::pin(inner.call(req));
        }

        let Some(session) = req.extensions().get::<Session>().cloned() else {
            tracing::error!("CSRF layer requires the session layer to run first");
            return Box::pin(async move {
                Ok(json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "server_error",
                    "session layer not applied",
                ))
            });
        };

        let submitted = extract_csrf_token(&req, &settings);

        Box::pin(async move {
            let method = req.method().clone();

            // Make sure the session has a token bound even on its first
            // mutating request; validation then compares against it.
            let _ = csrf.get_or_create(session.id());

            let Some(submitted) = submitted else {
                tracing::warn!(%method, %path, "CSRF token missing");
                return Ok(csrf_rejection("CSRF token missing"));
            };

            if !csrf.validate(session.id(), &submitted) {
                tracing::warn!(%method, %path, "CSRF token validation failed");
                return Ok(csrf_rejection("CSRF token invalid"));
            }

            inner.call(req).await
        })
    }
}

/// Check if an HTTP method is considered safe (doesn't modify state)
const fn is_method_safe(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

/// Extract the submitted CSRF token from the configured request header
fn extract_csrf_token(req: &Request, settings: &CsrfSettings) -> Option<CsrfToken> {
    let value = req.headers().get(&settings.header_name)?;
    let token_str = value.to_str().ok()?;
    Some(CsrfToken::from_string(token_str.to_string()))
}

/// 403 with a structured body; browsers and API callers both get JSON here,
/// matching the machine-triggered nature of CSRF failures
fn csrf_rejection(message: &str) -> Response<Body> {
    json_error(StatusCode::FORBIDDEN, "csrf_invalid", message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csrf::CSRF_HEADER_NAME;
    use crate::session::SessionId;
    use axum::routing::{get, post};
    use axum::Router;
    use tower::ServiceExt;

    fn service() -> Arc<CsrfService> {
        Arc::new(CsrfService::new())
    }

    fn app(csrf: Arc<CsrfService>) -> Router {
        Router::new()
            .route("/submit", post(|| async { "submitted" }))
            .route("/page", get(|| async { "page" }))
            .layer(CsrfLayer::with_settings(CsrfSettings::default(), csrf))
    }

    fn with_session(builder: http::request::Builder, id: &SessionId) -> http::request::Builder {
        builder.extension(Session::new(id.clone(), None, false))
    }

    #[test]
    fn safe_methods_are_exempt() {
        assert!(is_method_safe(&Method::GET));
        assert!(is_method_safe(&Method::HEAD));
        assert!(is_method_safe(&Method::OPTIONS));
        assert!(is_method_safe(&Method::TRACE));
        assert!(!is_method_safe(&Method::POST));
        assert!(!is_method_safe(&Method::PUT));
        assert!(!is_method_safe(&Method::DELETE));
        assert!(!is_method_safe(&Method::PATCH));
    }

    #[tokio::test]
    async fn get_passes_without_token() {
        let id = SessionId::generate();
        let request = with_session(Request::builder().uri("/page"), &id)
            .body(Body::empty())
            .unwrap();
        let response = app(service()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn post_without_token_is_403() {
        let id = SessionId::generate();
        let request = with_session(
            Request::builder().method(Method::POST).uri("/submit"),
            &id,
        )
        .body(Body::empty())
        .unwrap();
        let response = app(service()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn post_with_bound_token_passes() {
        let csrf = service();
        let id = SessionId::generate();
        let token = csrf.get_or_create(&id);

        let request = with_session(
            Request::builder()
                .method(Method::POST)
                .uri("/submit")
                .header(CSRF_HEADER_NAME, token.as_str()),
            &id,
        )
        .body(Body::empty())
        .unwrap();
        let response = app(csrf).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn post_with_foreign_token_is_403() {
        let csrf = service();
        let session_a = SessionId::generate();
        let session_b = SessionId::generate();
        let _ = csrf.get_or_create(&session_a);
        let token_b = csrf.get_or_create(&session_b);

        let request = with_session(
            Request::builder()
                .method(Method::POST)
                .uri("/submit")
                .header(CSRF_HEADER_NAME, token_b.as_str()),
            &session_a,
        )
        .body(Body::empty())
        .unwrap();
        let response = app(csrf).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn skip_paths_bypass_validation() {
        let settings = CsrfSettings {
            skip_paths: vec!["/submit".to_string()],
            ..CsrfSettings::default()
        };
        let id = SessionId::generate();
        let app = Router::new()
            .route("/submit", post(|| async { "submitted" }))
            .layer(CsrfLayer::with_settings(settings, service()));

        let request = with_session(
            Request::builder().method(Method::POST).uri("/submit"),
            &id,
        )
        .body(Body::empty())
        .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_session_layer_is_a_server_error() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/submit")
            .body(Body::empty())
            .unwrap();
        let response = app(service()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
