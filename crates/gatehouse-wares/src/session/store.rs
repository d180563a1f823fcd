//! Pluggable session store contract
//!
//! The store owns session records; the wares only read, create, update and
//! delete through this trait and never cache records across requests. The
//! trait is a capability set: test doubles implement it directly.

use std::time::Duration;

use async_trait::async_trait;

use crate::context::RequestContext;

/// The persisted `(user_id, payload)` tuple keyed by session identifier.
///
/// The payload is opaque cargo round-tripped through the store's marshal
/// contract; the core never inspects its structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub user_id: String,
    pub payload: String,
}

impl SessionRecord {
    pub fn new(user_id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            payload: payload.into(),
        }
    }

    /// A record with an empty user id or payload is equivalent to not found.
    pub fn is_resolved(&self) -> bool {
        !self.user_id.is_empty() && !self.payload.is_empty()
    }
}

/// Unified error type for session store operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),

    #[error("corrupt session payload: {0}")]
    CorruptPayload(#[from] serde_json::Error),

    #[error("could not marshal session payload: {0}")]
    Marshal(String),

    #[error("session store backend error: {0}")]
    Backend(String),
}

/// Capability set every session backend implements.
///
/// `read`, `create`, `update`, `delete` on the same session id must be
/// individually atomic from the store's perspective; the wares impose no
/// additional locking.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Look up a session record. `Ok(None)` means unknown or expired.
    async fn read(&self, session_id: &str) -> Result<Option<SessionRecord>, SessionError>;

    /// Bind a resolved identity onto the request context. May fail, for
    /// example on a corrupt payload.
    async fn create(
        &self,
        session_id: &str,
        user_id: &str,
        payload: &str,
        ctx: &mut RequestContext,
    ) -> Result<(), SessionError>;

    /// Bind only a fresh tracking identifier, no identity: the
    /// unauthenticated-but-tracked state.
    fn create_empty(&self, session_id: &str, ctx: &mut RequestContext);

    /// Upsert a record with a fresh TTL.
    async fn update(
        &self,
        session_id: &str,
        user_id: &str,
        payload: &str,
        ttl: Duration,
    ) -> Result<(), SessionError>;

    /// Remove one session.
    async fn delete(&self, session_id: &str, user_id: &str) -> Result<(), SessionError>;

    /// Remove every session belonging to a user.
    async fn revoke(&self, user_id: &str) -> Result<(), SessionError>;

    /// Produce the payload to persist from the current request context.
    fn marshal(&self, ctx: &RequestContext) -> Result<String, SessionError>;
}
