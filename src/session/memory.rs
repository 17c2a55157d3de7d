//! In-memory session store
//!
//! Default backend for single-process deployments and tests. Records live in
//! a map guarded by a read-write lock; each record carries its own mutex so
//! mutations serialize per session id while reads of distinct sessions stay
//! concurrent.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use super::{SessionData, SessionError, SessionId, SessionStore};

/// In-memory [`SessionStore`] implementation
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<SessionData>>>>,
}

impl MemorySessionStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live records, expired ones included
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Whether the store holds no records
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &SessionId) -> Result<Option<SessionData>, SessionError> {
        let entry = self.sessions.read().get(id).cloned();
        Ok(entry.map(|record| record.lock().clone()))
    }

    async fn save(&self, id: &SessionId, data: SessionData) -> Result<(), SessionError> {
        // Fast path: mutate an existing record under its own mutex.
        if let Some(record) = self.sessions.read().get(id).cloned() {
            *record.lock() = data;
            return Ok(());
        }
        self.sessions
            .write()
            .insert(id.clone(), Arc::new(Mutex::new(data)));
        Ok(())
    }

    async fn update(&self, id: &SessionId, data: SessionData) -> Result<bool, SessionError> {
        // Mutate under the per-key mutex; never insert. The entry is looked
        // up under the map lock, so a destroyed id stays destroyed.
        match self.sessions.read().get(id).cloned() {
            Some(record) => {
                *record.lock() = data;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn destroy(&self, id: &SessionId) -> Result<(), SessionError> {
        self.sessions.write().remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn load_missing_returns_none() {
        let store = MemorySessionStore::new();
        let loaded = store.load(&SessionId::generate()).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let store = MemorySessionStore::new();
        let id = SessionId::generate();
        let mut data = SessionData::new(Duration::hours(1));
        data.authenticated = true;

        store.save(&id, data).await.unwrap();
        let loaded = store.load(&id).await.unwrap().unwrap();
        assert!(loaded.authenticated);
    }

    #[tokio::test]
    async fn save_replaces_existing_record() {
        let store = MemorySessionStore::new();
        let id = SessionId::generate();
        store
            .save(&id, SessionData::new(Duration::hours(1)))
            .await
            .unwrap();

        let mut updated = SessionData::new(Duration::hours(1));
        updated.authenticated = true;
        store.save(&id, updated).await.unwrap();

        assert_eq!(store.len(), 1);
        assert!(store.load(&id).await.unwrap().unwrap().authenticated);
    }

    #[tokio::test]
    async fn destroy_removes_record() {
        let store = MemorySessionStore::new();
        let id = SessionId::generate();
        store
            .save(&id, SessionData::new(Duration::hours(1)))
            .await
            .unwrap();

        store.destroy(&id).await.unwrap();
        assert!(store.load(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_refuses_to_resurrect_destroyed_record() {
        let store = MemorySessionStore::new();
        let id = SessionId::generate();
        let mut data = SessionData::new(Duration::hours(1));
        data.authenticated = true;
        store.save(&id, data).await.unwrap();

        // A renewal that loaded the record before a concurrent logout
        // destroyed it must not write the stale copy back.
        let loaded = store.load(&id).await.unwrap().unwrap();
        store.destroy(&id).await.unwrap();

        assert!(!store.update(&id, loaded).await.unwrap());
        assert!(store.load(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_writes_through_to_live_record() {
        let store = MemorySessionStore::new();
        let id = SessionId::generate();
        store
            .save(&id, SessionData::new(Duration::hours(1)))
            .await
            .unwrap();

        let mut updated = SessionData::new(Duration::hours(1));
        updated.authenticated = true;
        assert!(store.update(&id, updated).await.unwrap());
        assert!(store.load(&id).await.unwrap().unwrap().authenticated);
    }

    #[tokio::test]
    async fn destroy_is_idempotent() {
        let store = MemorySessionStore::new();
        let id = SessionId::generate();
        store.destroy(&id).await.unwrap();
        store.destroy(&id).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn concurrent_saves_do_not_lose_records() {
        let store = Arc::new(MemorySessionStore::new());
        let ids: Vec<_> = (0..32).map(|_| SessionId::generate()).collect();

        let mut handles = Vec::new();
        for id in &ids {
            let store = Arc::clone(&store);
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                store.save(&id, SessionData::new(Duration::hours(1))).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.len(), ids.len());
    }
}
