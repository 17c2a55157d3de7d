//! Session store capability trait
//!
//! The store is injected into the pipeline rather than reached as ambient
//! state, so in-memory, distributed, and test doubles are interchangeable.

use async_trait::async_trait;

use super::{SessionData, SessionError, SessionId};

/// Capability interface over the session backing store
///
/// The store is the only shared mutable resource in the pipeline. Concurrent
/// requests bearing the same session id may race (simultaneous logout and
/// page fetch); implementations must serialize mutations per session id.
/// Reads may be concurrent.
///
/// Transient backend failures surface as [`SessionError::Backend`], which
/// the pipeline renders as a server error; no retries happen internally.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch the record for `id`, if one exists
    async fn load(&self, id: &SessionId) -> Result<Option<SessionData>, SessionError>;

    /// Create or replace the record for `id`
    async fn save(&self, id: &SessionId, data: SessionData) -> Result<(), SessionError>;

    /// Replace the record for `id` only if one still exists
    ///
    /// Returns `Ok(false)` without writing when there is no record. Rolling
    /// renewal goes through this rather than [`save`](Self::save): a session
    /// destroyed between load and write (logout racing a page fetch) must
    /// stay destroyed, never be re-created from the stale copy.
    async fn update(&self, id: &SessionId, data: SessionData) -> Result<bool, SessionError>;

    /// Remove the record for `id`
    ///
    /// Destroying an id with no record is a no-op, so logout stays
    /// idempotent. A returned error means the record may still exist and
    /// must be reported, never swallowed.
    async fn destroy(&self, id: &SessionId) -> Result<(), SessionError>;
}
