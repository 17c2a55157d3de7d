//! Request extractors
//!
//! Handler-side access to the session view and the session-bound CSRF token.
//! Both require the session middleware to have run; a missing extension is a
//! wiring bug and rejects with a 500.

use axum::extract::{FromRef, FromRequestParts};
use http::request::Parts;
use http::StatusCode;

use crate::csrf::CsrfToken;
use crate::session::Session;
use crate::state::GatehouseState;

const NO_SESSION: (StatusCode, &str) = (
    StatusCode::INTERNAL_SERVER_ERROR,
    "session not found - ensure the session layer is applied",
);

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Self>().cloned().ok_or(NO_SESSION)
    }
}

/// Extractor for the session-bound CSRF token
///
/// Retrieves or creates the token for the current session, for rendering
/// into pages and for the `/csrf-token` endpoint.
///
/// # Example
///
/// ```rust,ignore
/// async fn render_form(csrf: CsrfTokenExtractor) -> Html<String> {
///     let token = csrf.token();
///     Html(format!(r#"<meta name="csrf-token" content="{token}">"#))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CsrfTokenExtractor {
    token: CsrfToken,
}

impl CsrfTokenExtractor {
    /// The token as a string
    #[must_use]
    pub fn token(&self) -> &str {
        self.token.as_str()
    }

    /// The token value
    #[must_use]
    pub const fn value(&self) -> &CsrfToken {
        &self.token
    }
}

impl<S> FromRequestParts<S> for CsrfTokenExtractor
where
    S: Send + Sync,
    GatehouseState: FromRef<S>,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = GatehouseState::from_ref(state);
        let session = parts.extensions.get::<Session>().ok_or(NO_SESSION)?;
        let token = state.csrf().get_or_create(session.id());
        Ok(Self { token })
    }
}
