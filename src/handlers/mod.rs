//! Request handlers for the gatekeeper's own endpoints
//!
//! Everything here runs strictly after the pipeline: by the time a handler
//! executes, the gate has produced `Allow` for the request. Handlers that
//! bind state to the session (the CSRF token endpoint, rendered pages, the
//! login submission) attach [`SessionData`] to their response; the session
//! middleware persists it and issues the cookie. Sessions are never
//! persisted for requests that write nothing.

use axum::extract::State;
use axum::response::{IntoResponse, Json, Response};
use http::{Method, StatusCode, Uri};
use serde_json::json;

use crate::auth::Credentials;
use crate::error::{render_error, GatehouseError};
use crate::extractors::CsrfTokenExtractor;
use crate::middleware::redirect_to_login;
use crate::session::{Session, SessionData};
use crate::state::GatehouseState;
use crate::views;

/// Attach the session record to the response so the middleware persists it
fn attach_session_data(response: &mut Response, session: &Session, state: &GatehouseState) {
    let idle = state.config().session.idle_timeout();
    let data = session
        .data()
        .cloned()
        .unwrap_or_else(|| SessionData::new(idle));
    response.extensions_mut().insert(data);
}

/// `GET /csrf-token`: issue the session-bound token
///
/// Persisting the session here is what binds the token to a cookie-backed
/// id; without it the client could never present the same session again.
pub async fn csrf_token(
    State(state): State<GatehouseState>,
    session: Session,
    csrf: CsrfTokenExtractor,
) -> Response {
    let mut response = Json(json!({ "token": csrf.token() })).into_response();
    attach_session_data(&mut response, &session, &state);
    response
}

/// Login view, served for `/login`, any sub-path, and any method
///
/// The same view renders regardless of sub-path; client-side routing owns
/// everything below `/login`.
pub async fn login_page(
    State(state): State<GatehouseState>,
    session: Session,
    csrf: CsrfTokenExtractor,
) -> Response {
    let mut response = views::login_page(csrf.token()).into_response();
    attach_session_data(&mut response, &session, &state);
    response
}

/// `GET /logout`: destroy the session and send the browser to `/login`
///
/// With no live authenticated session this is an idempotent no-op redirect.
/// Otherwise the record is destroyed in full (not just the flag flipped),
/// and the destroy must complete before the redirect is produced: a failed
/// destroy is a server error, never a silent "logged out" response.
pub async fn logout(State(state): State<GatehouseState>, session: Session) -> Response {
    if !session.authenticated() {
        return redirect_to_login();
    }

    if let Err(err) = state.sessions().destroy(session.id()).await {
        tracing::error!(%err, session_id = %session.id(), "logout destroy failed");
        return render_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "server_error",
            "logout failed",
            &Method::GET,
            "/logout",
        );
    }
    state.csrf().remove(session.id());

    tracing::info!(session_id = %session.id(), "session destroyed on logout");
    redirect_to_login()
}

/// `POST /api/login`: delegate to the login collaborator
///
/// # Errors
///
/// Returns 401 on bad credentials, 500 when the collaborator's backend
/// fails.
pub async fn api_login(
    State(state): State<GatehouseState>,
    session: Session,
    Json(credentials): Json<Credentials>,
) -> Result<Response, GatehouseError> {
    let verified = state.login().verify(&credentials).await?;
    if !verified {
        tracing::warn!(username = %credentials.username, "login rejected");
        return Err(GatehouseError::Unauthorized("invalid credentials".into()));
    }

    let idle = state.config().session.idle_timeout();
    let mut data = session
        .data()
        .cloned()
        .unwrap_or_else(|| SessionData::new(idle));
    data.authenticated = true;
    data.touch(idle);

    tracing::info!(session_id = %session.id(), "session authenticated");
    let mut response = Json(json!({ "ok": true })).into_response();
    response.extensions_mut().insert(data);
    Ok(response)
}

/// Fallback inside the `/api` subtree, a structured 404
pub async fn api_fallback(uri: Uri) -> Response {
    GatehouseError::NotFound(uri.path().to_string()).into_response()
}

/// Catch-all application entry point
///
/// GET serves the single-page app shell (the gate has already required
/// authentication for this class); any other method on an unrouted path is
/// a 404 with a structured body.
pub async fn app_fallback(
    State(state): State<GatehouseState>,
    method: Method,
    uri: Uri,
    session: Session,
    csrf: CsrfTokenExtractor,
) -> Response {
    if method != Method::GET {
        return render_error(
            StatusCode::NOT_FOUND,
            "not_found",
            "no such route",
            &method,
            uri.path(),
        );
    }

    let mut response = views::app_page(csrf.token()).into_response();
    attach_session_data(&mut response, &session, &state);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::FixedCredentials;
    use crate::config::GatehouseConfig;
    use crate::session::{MemorySessionStore, SessionError, SessionId, SessionStore};
    use async_trait::async_trait;
    use std::sync::Arc;

    fn state_with_store(store: Arc<dyn SessionStore>) -> GatehouseState {
        GatehouseState::new(
            GatehouseConfig::default(),
            store,
            Arc::new(FixedCredentials::new("admin", "change-me")),
        )
    }

    fn authenticated_session() -> Session {
        let mut data = SessionData::new(chrono::Duration::hours(1));
        data.authenticated = true;
        Session::new(SessionId::generate(), Some(data), false)
    }

    #[tokio::test]
    async fn logout_without_session_is_a_noop_redirect() {
        let state = state_with_store(Arc::new(MemorySessionStore::new()));
        let session = Session::new(SessionId::generate(), None, true);

        // Twice: the no-op path must be idempotent.
        for _ in 0..2 {
            let response = logout(State(state.clone()), session.clone()).await;
            assert_eq!(response.status(), StatusCode::FOUND);
            assert_eq!(
                response.headers().get(http::header::LOCATION).unwrap(),
                "/login"
            );
        }
    }

    #[tokio::test]
    async fn logout_destroys_record_and_token() {
        let store = Arc::new(MemorySessionStore::new());
        let state = state_with_store(store.clone());
        let session = authenticated_session();
        store
            .save(session.id(), session.data().unwrap().clone())
            .await
            .unwrap();
        let token = state.csrf().get_or_create(session.id());

        let response = logout(State(state.clone()), session.clone()).await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert!(store.load(session.id()).await.unwrap().is_none());
        assert!(!state.csrf().validate(session.id(), &token));
    }

    struct FailingStore;

    #[async_trait]
    impl SessionStore for FailingStore {
        async fn load(&self, _id: &SessionId) -> Result<Option<SessionData>, SessionError> {
            Err(SessionError::Backend("store down".into()))
        }
        async fn save(&self, _id: &SessionId, _data: SessionData) -> Result<(), SessionError> {
            Err(SessionError::Backend("store down".into()))
        }
        async fn update(&self, _id: &SessionId, _data: SessionData) -> Result<bool, SessionError> {
            Err(SessionError::Backend("store down".into()))
        }
        async fn destroy(&self, _id: &SessionId) -> Result<(), SessionError> {
            Err(SessionError::Backend("store down".into()))
        }
    }

    #[tokio::test]
    async fn failed_destroy_is_a_server_error_not_a_redirect() {
        let state = state_with_store(Arc::new(FailingStore));
        let session = authenticated_session();

        let response = logout(State(state), session).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get(http::header::LOCATION).is_none());
    }

    #[tokio::test]
    async fn api_login_rejects_bad_credentials() {
        let state = state_with_store(Arc::new(MemorySessionStore::new()));
        let session = Session::new(SessionId::generate(), None, true);
        let result = api_login(
            State(state),
            session,
            Json(Credentials {
                username: "admin".into(),
                password: "wrong".into(),
            }),
        )
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn api_login_marks_session_authenticated() {
        let state = state_with_store(Arc::new(MemorySessionStore::new()));
        let session = Session::new(SessionId::generate(), None, true);
        let response = api_login(
            State(state),
            session,
            Json(Credentials {
                username: "admin".into(),
                password: "change-me".into(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let data = response
            .extensions()
            .get::<SessionData>()
            .expect("session data attached for persistence");
        assert!(data.authenticated);
    }

    #[tokio::test]
    async fn api_fallback_is_structured_404() {
        let response = api_fallback(Uri::from_static("/api/nope")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
