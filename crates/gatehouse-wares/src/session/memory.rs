//! In-memory session store
//!
//! Stores all records in memory behind a `tokio::sync::RwLock`. Suitable for
//! development, testing, and single-instance deployments where persistence
//! across restarts is not required. Expiry is tracked as Unix millis and
//! enforced lazily on read, with [`InMemorySessionStore::purge_expired`]
//! available for periodic maintenance.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::context::RequestContext;
use crate::session::store::{SessionError, SessionRecord, SessionStore};

#[derive(Debug, Clone)]
struct StoredRecord {
    user_id: String,
    payload: String,
    /// Unix millis after which the record reads as not found.
    expires_at: u64,
}

#[derive(Debug, Default)]
struct StoreState {
    records: HashMap<String, StoredRecord>,
    /// user id -> session ids, for revoke.
    by_user: HashMap<String, HashSet<String>>,
}

impl StoreState {
    fn remove(&mut self, session_id: &str) -> Option<StoredRecord> {
        let record = self.records.remove(session_id)?;
        if let Some(sessions) = self.by_user.get_mut(&record.user_id) {
            sessions.remove(session_id);
            if sessions.is_empty() {
                self.by_user.remove(&record.user_id);
            }
        }
        Some(record)
    }

    fn insert(&mut self, session_id: String, record: StoredRecord) {
        // Re-home the index entry if the session changed owners.
        let changed_owner = self
            .records
            .get(&session_id)
            .is_some_and(|previous| previous.user_id != record.user_id);
        if changed_owner {
            self.remove(&session_id);
        }
        self.by_user
            .entry(record.user_id.clone())
            .or_default()
            .insert(session_id.clone());
        self.records.insert(session_id, record);
    }
}

fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis() as u64
}

/// Thread-safe in-memory implementation of [`SessionStore`].
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (possibly expired but not yet purged) records.
    pub async fn session_count(&self) -> usize {
        self.state.read().await.records.len()
    }

    /// Drop every expired record; returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = now_millis();
        let mut state = self.state.write().await;
        let expired: Vec<String> = state
            .records
            .iter()
            .filter(|(_, record)| record.expires_at <= now)
            .map(|(session_id, _)| session_id.clone())
            .collect();
        for session_id in &expired {
            state.remove(session_id);
            debug!(session_id, "purged expired session");
        }
        if !expired.is_empty() {
            info!(count = expired.len(), "purged expired sessions");
        }
        expired.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn read(&self, session_id: &str) -> Result<Option<SessionRecord>, SessionError> {
        let mut state = self.state.write().await;
        let Some(record) = state.records.get(session_id) else {
            return Ok(None);
        };
        if record.expires_at <= now_millis() {
            state.remove(session_id);
            debug!(session_id, "session expired on read");
            return Ok(None);
        }
        Ok(Some(SessionRecord::new(
            record.user_id.clone(),
            record.payload.clone(),
        )))
    }

    async fn create(
        &self,
        session_id: &str,
        user_id: &str,
        payload: &str,
        ctx: &mut RequestContext,
    ) -> Result<(), SessionError> {
        // A payload that no longer parses is a corrupt record.
        let parsed: Value = serde_json::from_str(payload)?;
        ctx.set_session_id(session_id);
        ctx.set_session_user_id(user_id);
        ctx.set_session_payload(parsed);
        Ok(())
    }

    fn create_empty(&self, session_id: &str, ctx: &mut RequestContext) {
        ctx.set_session_id(session_id);
    }

    async fn update(
        &self,
        session_id: &str,
        user_id: &str,
        payload: &str,
        ttl: Duration,
    ) -> Result<(), SessionError> {
        let record = StoredRecord {
            user_id: user_id.to_string(),
            payload: payload.to_string(),
            expires_at: now_millis() + ttl.as_millis() as u64,
        };
        self.state
            .write()
            .await
            .insert(session_id.to_string(), record);
        Ok(())
    }

    async fn delete(&self, session_id: &str, _user_id: &str) -> Result<(), SessionError> {
        let mut state = self.state.write().await;
        match state.remove(session_id) {
            Some(_) => Ok(()),
            None => Err(SessionError::NotFound(session_id.to_string())),
        }
    }

    async fn revoke(&self, user_id: &str) -> Result<(), SessionError> {
        let mut state = self.state.write().await;
        let session_ids: Vec<String> = state
            .by_user
            .get(user_id)
            .map(|sessions| sessions.iter().cloned().collect())
            .unwrap_or_default();
        for session_id in &session_ids {
            state.remove(session_id);
        }
        debug!(user_id, count = session_ids.len(), "revoked user sessions");
        Ok(())
    }

    fn marshal(&self, ctx: &RequestContext) -> Result<String, SessionError> {
        let payload = ctx
            .session_payload()
            .ok_or_else(|| SessionError::Marshal("no session payload bound to context".to_string()))?;
        Ok(payload.to_string())
    }
}
