//! Error taxonomy and response rendering
//!
//! CSRF and auth failures travel as control-flow outcomes, not panics; this
//! module maps the taxonomy onto HTTP responses. Browser page navigations
//! (GET, non-API) receive human-readable views; API and mutating callers
//! always receive structured JSON bodies, never HTML. The specific status is
//! always preserved; nothing is flattened to 500 when a better code exists.

use axum::response::{IntoResponse, Json, Response};
use http::{Method, StatusCode};
use serde::Serialize;
use thiserror::Error;

use crate::session::SessionError;
use crate::views;

/// Gatekeeper error type
#[derive(Debug, Error)]
pub enum GatehouseError {
    /// CSRF token missing or mismatched (403)
    #[error("CSRF token invalid")]
    CsrfInvalid,

    /// Unauthorized (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Session store failure (500)
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Any other server-side failure (500)
    #[error("Server error: {0}")]
    ServerError(String),
}

impl GatehouseError {
    /// HTTP status for this error
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::CsrfInvalid => StatusCode::FORBIDDEN,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Session(_) | Self::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable error code
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::CsrfInvalid => "csrf_invalid",
            Self::Unauthorized(_) => "unauthorized",
            Self::NotFound(_) => "not_found",
            Self::Session(_) | Self::ServerError(_) => "server_error",
        }
    }
}

/// Structured error body for API and non-GET callers
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Stable machine-readable code
    pub error: &'static str,
    /// Human-oriented detail
    pub message: String,
    /// HTTP status, repeated in the body
    pub status: u16,
}

/// Build a structured JSON error response
#[must_use]
pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    let body = ErrorBody {
        error: code,
        message: message.into(),
        status: status.as_u16(),
    };
    (status, Json(body)).into_response()
}

/// Render an error for a request, choosing HTML or JSON by caller kind
///
/// GET requests outside `/api/` are browser navigations and get the error
/// view; everything else gets the structured body.
#[must_use]
pub fn render_error(
    status: StatusCode,
    code: &'static str,
    message: &str,
    method: &Method,
    path: &str,
) -> Response {
    if *method == Method::GET && !path.starts_with("/api/") {
        views::error_page(status, path, message)
    } else {
        json_error(status, code, message)
    }
}

impl IntoResponse for GatehouseError {
    fn into_response(self) -> Response {
        json_error(self.status(), self.code(), self.to_string())
    }
}
