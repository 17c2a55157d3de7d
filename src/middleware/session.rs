//! Session middleware
//!
//! Handles cookie extraction, record loading, rolling renewal, and
//! persistence. The middleware itself never creates store records: a fresh
//! session is persisted only when a handler attaches [`SessionData`] to its
//! response, and the cookie is issued at that moment. An expired record is
//! destroyed on sight and the request proceeds as unauthenticated.
//!
//! Store failures surface as server errors; they are never swallowed.

use std::str::FromStr;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::Request;
use axum::response::Response;
use http::header::{COOKIE, SET_COOKIE};
use http::StatusCode;
use tower::{Layer, Service};

use crate::config::SessionSettings;
use crate::csrf::CsrfService;
use crate::error::render_error;
use crate::session::{Session, SessionData, SessionId, SessionStore};
use crate::state::GatehouseState;

/// Layer inserting [`SessionMiddleware`] into a service stack
#[derive(Clone)]
pub struct SessionLayer {
    settings: SessionSettings,
    store: Arc<dyn SessionStore>,
    csrf: Arc<CsrfService>,
}

impl std::fmt::Debug for SessionLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLayer")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl SessionLayer {
    /// Create a session layer from application state
    #[must_use]
    pub fn new(state: &GatehouseState) -> Self {
        Self {
            settings: state.config().session.clone(),
            store: Arc::clone(state.sessions()),
            csrf: Arc::clone(state.csrf()),
        }
    }

    /// Create a session layer with explicit settings, store, and CSRF service
    ///
    /// The CSRF handle is needed so a token dies with the session record it
    /// is bound to, including sessions destroyed on idle expiry.
    #[must_use]
    pub fn with_settings(
        settings: SessionSettings,
        store: Arc<dyn SessionStore>,
        csrf: Arc<CsrfService>,
    ) -> Self {
        Self {
            settings,
            store,
            csrf,
        }
    }
}

impl<S> Layer<S> for SessionLayer {
    type Service = SessionMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SessionMiddleware {
            inner,
            settings: Arc::new(self.settings.clone()),
            store: Arc::clone(&self.store),
            csrf: Arc::clone(&self.csrf),
        }
    }
}

/// Middleware attaching a [`Session`] view to every request
#[derive(Clone)]
pub struct SessionMiddleware<S> {
    inner: S,
    settings: Arc<SessionSettings>,
    store: Arc<dyn SessionStore>,
    csrf: Arc<CsrfService>,
}

impl<S: std::fmt::Debug> std::fmt::Debug for SessionMiddleware<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionMiddleware")
            .field("inner", &self.inner)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl<S> Service<Request> for SessionMiddleware<S>
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
        let settings = Arc::clone(&self.settings);
        let store = Arc::clone(&self.store);
        let csrf = Arc::clone(&self.csrf);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let method = req.method().clone();
            let path = req.uri().path().to_string();
            let idle = settings.idle_timeout();

            let presented = extract_session_id(&req, &settings.cookie_name);

            // Load the record, destroying expired ones on sight. A store
            // failure here must not let the request through unexamined.
            let (id, data, fresh) = match presented {
                Some(id) => match store.load(&id).await {
                    Ok(Some(mut data)) => {
                        if data.validate_and_touch(idle) {
                            if settings.rolling {
                                // Update, never save: a logout racing this
                                // request may have destroyed the record, and
                                // writing the stale copy back would
                                // resurrect the session.
                                match store.update(&id, data.clone()).await {
                                    Ok(true) => (id, Some(data), false),
                                    Ok(false) => (SessionId::generate(), None, true),
                                    Err(err) => {
                                        tracing::error!(%err, "session renewal failed");
                                        return Ok(store_failure(&method, &path));
                                    }
                                }
                            } else {
                                (id, Some(data), false)
                            }
                        } else {
                            if let Err(err) = store.destroy(&id).await {
                                tracing::error!(%err, "expired session cleanup failed");
                                return Ok(store_failure(&method, &path));
                            }
                            // The token is bound to the record; it dies here
                            // too, or it would outlive the session.
                            csrf.remove(&id);
                            (SessionId::generate(), None, true)
                        }
                    }
                    Ok(None) => (SessionId::generate(), None, true),
                    Err(err) => {
                        tracing::error!(%err, "session load failed");
                        return Ok(store_failure(&method, &path));
                    }
                },
                None => (SessionId::generate(), None, true),
            };

            let session = Session::new(id.clone(), data, fresh);
            req.extensions_mut().insert(session);

            let mut response = inner.call(req).await?;

            // Persist only what a handler put on the response. This is the
            // commit point: a failed save must not masquerade as success.
            if let Some(data) = response.extensions().get::<SessionData>().cloned() {
                // Fresh ids create their record; existing ids only update,
                // so a session destroyed mid-request stays destroyed.
                let persisted = if fresh {
                    store.save(&id, data).await.map(|()| true)
                } else {
                    store.update(&id, data).await
                };
                match persisted {
                    Ok(true) => set_session_cookie(&mut response, &id, &settings),
                    Ok(false) => {}
                    Err(err) => {
                        tracing::error!(%err, "session persist failed");
                        return Ok(store_failure(&method, &path));
                    }
                }
            } else if !fresh && settings.rolling {
                // Re-issue the cookie so Max-Age tracks the extended expiry.
                set_session_cookie(&mut response, &id, &settings);
            }

            Ok(response)
        })
    }
}

fn store_failure(method: &http::Method, path: &str) -> Response<Body> {
    render_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "server_error",
        "session store unavailable",
        method,
        path,
    )
}

/// Extract the session id from request cookies
fn extract_session_id(req: &Request, cookie_name: &str) -> Option<SessionId> {
    let cookie_header = req.headers().get(COOKIE)?;
    let cookie_str = cookie_header.to_str().ok()?;

    for cookie in cookie_str.split(';') {
        let cookie = cookie.trim();
        if let Some((name, value)) = cookie.split_once('=') {
            if name.trim() == cookie_name {
                return SessionId::from_str(value.trim()).ok();
            }
        }
    }

    None
}

/// Set the session cookie on a response
fn set_session_cookie(
    response: &mut Response<Body>,
    session_id: &SessionId,
    settings: &SessionSettings,
) {
    let mut cookie_value = format!(
        "{}={}; Path={}; Max-Age={}; SameSite={}",
        settings.cookie_name,
        session_id.as_str(),
        settings.cookie_path,
        settings.idle_timeout_secs,
        settings.same_site.as_str()
    );

    if settings.http_only {
        cookie_value.push_str("; HttpOnly");
    }

    if settings.secure {
        cookie_value.push_str("; Secure");
    }

    if let Ok(header_value) = cookie_value.parse() {
        response.headers_mut().append(SET_COOKIE, header_value);
    }
}
