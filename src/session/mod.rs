//! Session types and the session store contract
//!
//! A session correlates a client (via an opaque cookie) with authentication
//! state across requests. The store owns every [`SessionData`] record; the
//! rest of the pipeline only reads the `authenticated` flag and asks the
//! store to destroy records on logout.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod memory;
pub mod store;

pub use memory::MemorySessionStore;
pub use store::SessionStore;

/// Unique session identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a new cryptographically secure session ID
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from a string (validates format)
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidSessionId`] if the string is not a
    /// valid UUID.
    pub fn try_from_string(s: String) -> Result<Self, SessionError> {
        Uuid::parse_str(&s)
            .map(|_| Self(s))
            .map_err(|_| SessionError::InvalidSessionId)
    }

    /// Get the session ID as a string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from_string(s.to_string())
    }
}

/// Per-session record held by the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    /// Whether the login flow has marked this session authenticated
    pub authenticated: bool,
    /// When this session was created
    pub created_at: DateTime<Utc>,
    /// When this session was last accessed
    pub last_accessed: DateTime<Utc>,
    /// When this session expires (idle timeout)
    pub expires_at: DateTime<Utc>,
}

impl SessionData {
    /// Create a new unauthenticated record expiring after `idle_timeout`
    #[must_use]
    pub fn new(idle_timeout: Duration) -> Self {
        let now = Utc::now();
        Self {
            authenticated: false,
            created_at: now,
            last_accessed: now,
            expires_at: now + idle_timeout,
        }
    }

    /// Check if the record has passed its idle timeout
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Update last access time and extend expiration (rolling renewal)
    pub fn touch(&mut self, extend_by: Duration) {
        self.last_accessed = Utc::now();
        self.expires_at = self.last_accessed + extend_by;
    }

    /// Validate the record is not expired and touch it if valid
    ///
    /// Returns `true` and extends the lifetime when the record is live;
    /// returns `false` and leaves the record untouched when expired.
    pub fn validate_and_touch(&mut self, extend_by: Duration) -> bool {
        if self.is_expired() {
            false
        } else {
            self.touch(extend_by);
            true
        }
    }
}

/// Request-scoped view of the client's session
///
/// Inserted into request extensions by the session middleware. Holds the
/// session id the request presented (or a freshly generated one when no
/// valid cookie arrived) and the loaded record, if any. An absent or
/// expired record reads as `authenticated == false`, never as an error.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    data: Option<SessionData>,
    fresh: bool,
}

impl Session {
    /// Build a session view
    ///
    /// `fresh` marks ids generated for this request, as opposed to ids
    /// presented by a live cookie.
    #[must_use]
    pub const fn new(id: SessionId, data: Option<SessionData>, fresh: bool) -> Self {
        Self { id, data, fresh }
    }

    /// The session identifier
    #[must_use]
    pub const fn id(&self) -> &SessionId {
        &self.id
    }

    /// The loaded record, when the store holds one
    #[must_use]
    pub const fn data(&self) -> Option<&SessionData> {
        self.data.as_ref()
    }

    /// Whether this id was generated for the current request
    #[must_use]
    pub const fn is_fresh(&self) -> bool {
        self.fresh
    }

    /// Whether the session is authenticated
    ///
    /// Absent and expired records count as unauthenticated.
    #[must_use]
    pub fn authenticated(&self) -> bool {
        self.data.as_ref().is_some_and(|d| d.authenticated)
    }
}

/// Session-related errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Invalid session ID format
    #[error("Invalid session ID")]
    InvalidSessionId,

    /// Session not found
    #[error("Session not found")]
    NotFound,

    /// Backing store failure
    #[error("Session store error: {0}")]
    Backend(String),
}
