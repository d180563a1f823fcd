//! Session lifecycle wares
//!
//! Three wares drive the per-request session state machine against the
//! pluggable [`SessionStore`]:
//!
//! - [`SessionGet`] resolves the identity for the request from the session
//!   cookie, minting a fresh tracked identifier whenever resolution fails.
//!   It never terminates the chain.
//! - [`SessionDel`] removes the resolved session.
//! - [`SessionSet`] persists the context's session payload.
//!
//! `SessionDel` and `SessionSet` treat a missing identity on the context as
//! a pipeline wiring defect (500), not a client error.

use std::sync::Arc;

use async_trait::async_trait;
use hyper::StatusCode;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::context::{RequestContext, SESSION_ID};
use crate::errors::{ErrorKind, safe_error_message};
use crate::session::store::SessionStore;
use crate::ware::{Disposition, Ware};

/// Entry ware of the session lifecycle: identify or start tracking.
pub struct SessionGet {
    config: Arc<AppConfig>,
    store: Arc<dyn SessionStore>,
}

impl SessionGet {
    pub fn new(config: Arc<AppConfig>, store: Arc<dyn SessionStore>) -> Self {
        Self { config, store }
    }

    fn write_cookie(&self, ctx: &mut RequestContext, session_id: &str) {
        ctx.set_cookie(
            &self.config.cookie_path,
            SESSION_ID,
            session_id,
            self.config.cookie_ttl,
        );
    }

    /// Mint a fresh identifier and bind it without identity. Every fallback
    /// path lands here; a failing session id is never reused.
    fn start_empty(&self, ctx: &mut RequestContext) {
        let session_id = Uuid::now_v7().to_string();
        self.write_cookie(ctx, &session_id);
        self.store.create_empty(&session_id, ctx);
    }

    /// Best-effort cleanup of a record that failed to resolve. The result is
    /// consumed here; a delete failure is logged and never reaches the
    /// response decision.
    async fn discard(&self, session_id: &str, user_id: &str) {
        if let Err(err) = self.store.delete(session_id, user_id).await {
            warn!(error = %err, session_id, "best-effort session delete failed");
        }
    }
}

#[async_trait]
impl Ware for SessionGet {
    async fn call(&self, ctx: &mut RequestContext) -> Disposition {
        let session_id = ctx
            .cookie(SESSION_ID)
            .filter(|value| !value.is_empty())
            .map(str::to_owned);
        let Some(session_id) = session_id else {
            self.start_empty(ctx);
            return Disposition::Continue;
        };

        let record = match self.store.read(&session_id).await {
            Ok(Some(record)) if record.is_resolved() => record,
            Ok(_) => {
                self.start_empty(ctx);
                return Disposition::Continue;
            }
            Err(err) => {
                // A flaky store never fails the request on this path.
                debug!(error = %err, session_id, "session read failed; starting empty session");
                self.start_empty(ctx);
                return Disposition::Continue;
            }
        };

        if let Err(err) = self
            .store
            .create(&session_id, &record.user_id, &record.payload, ctx)
            .await
        {
            warn!(error = %err, session_id, "session create failed; minting a fresh identifier");
            self.discard(&session_id, &record.user_id).await;
            self.start_empty(ctx);
            return Disposition::Continue;
        }

        // Unset refresh flag means refresh.
        if ctx.session_refresh().unwrap_or(true) {
            self.write_cookie(ctx, &session_id);
            if let Err(err) = self
                .store
                .update(
                    &session_id,
                    &record.user_id,
                    &record.payload,
                    self.config.session_ttl,
                )
                .await
            {
                // The session is already usable for this request.
                warn!(error = %err, session_id, "session refresh update failed");
            }
        }
        Disposition::Continue
    }
}

/// Ware deleting the session resolved on the context.
pub struct SessionDel {
    config: Arc<AppConfig>,
    store: Arc<dyn SessionStore>,
}

impl SessionDel {
    pub fn new(config: Arc<AppConfig>, store: Arc<dyn SessionStore>) -> Self {
        Self { config, store }
    }

    fn wiring_error(&self, ctx: &mut RequestContext, what: &str) -> Disposition {
        ctx.set_last_error(format!("session delete: {what} missing from context"));
        let message = safe_error_message(&self.config, ctx, ErrorKind::Generic);
        Disposition::halt(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

#[async_trait]
impl Ware for SessionDel {
    async fn call(&self, ctx: &mut RequestContext) -> Disposition {
        let Some(session_id) = ctx.session_id().map(str::to_owned) else {
            return self.wiring_error(ctx, SESSION_ID);
        };
        let Some(user_id) = ctx.session_user_id().map(str::to_owned) else {
            return self.wiring_error(ctx, "session user id");
        };
        if let Err(err) = self.store.delete(&session_id, &user_id).await {
            ctx.set_last_error(err.to_string());
            let message = safe_error_message(&self.config, ctx, ErrorKind::Generic);
            return Disposition::halt(StatusCode::INTERNAL_SERVER_ERROR, message);
        }
        Disposition::Continue
    }
}

/// Ware persisting the context's session payload with the configured TTL.
pub struct SessionSet {
    config: Arc<AppConfig>,
    store: Arc<dyn SessionStore>,
}

impl SessionSet {
    pub fn new(config: Arc<AppConfig>, store: Arc<dyn SessionStore>) -> Self {
        Self { config, store }
    }

    fn fail(&self, ctx: &mut RequestContext, err: String) -> Disposition {
        ctx.set_last_error(err);
        let message = safe_error_message(&self.config, ctx, ErrorKind::Generic);
        Disposition::halt(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

#[async_trait]
impl Ware for SessionSet {
    async fn call(&self, ctx: &mut RequestContext) -> Disposition {
        let payload = match self.store.marshal(ctx) {
            Ok(payload) => payload,
            Err(err) => return self.fail(ctx, err.to_string()),
        };
        let Some(session_id) = ctx.session_id().map(str::to_owned) else {
            return self.fail(ctx, format!("session set: {SESSION_ID} missing from context"));
        };
        let Some(user_id) = ctx.session_user_id().map(str::to_owned) else {
            return self.fail(ctx, "session set: session user id missing from context".to_string());
        };
        if let Err(err) = self
            .store
            .update(&session_id, &user_id, &payload, self.config.session_ttl)
            .await
        {
            return self.fail(ctx, err.to_string());
        }
        Disposition::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::store::{SessionError, SessionRecord};
    use std::sync::Mutex;
    use std::time::Duration;

    const EXISTING: &str = "SOME-SESSION-ID";
    const MISSING: &str = "NONEXISTENT-SESSION-ID";
    const USER: &str = "SOME-USER-ID";
    const PAYLOAD: &str = r#"{"id": "SOME-USER-ID"}"#;

    /// Scriptable store double recording every call.
    #[derive(Default)]
    struct ScriptedStore {
        calls: Mutex<Vec<String>>,
        fail_create: bool,
        fail_delete: bool,
        fail_update: bool,
        fail_marshal: bool,
    }

    impl ScriptedStore {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }
    }

    #[async_trait]
    impl SessionStore for ScriptedStore {
        async fn read(&self, session_id: &str) -> Result<Option<SessionRecord>, SessionError> {
            self.record(format!("read:{session_id}"));
            if session_id == MISSING {
                Ok(None)
            } else {
                Ok(Some(SessionRecord::new(USER, PAYLOAD)))
            }
        }

        async fn create(
            &self,
            session_id: &str,
            user_id: &str,
            _payload: &str,
            ctx: &mut RequestContext,
        ) -> Result<(), SessionError> {
            self.record(format!("create:{session_id}"));
            if self.fail_create {
                return Err(SessionError::Backend("scripted create error".to_string()));
            }
            ctx.set_session_id(session_id);
            ctx.set_session_user_id(user_id);
            Ok(())
        }

        fn create_empty(&self, session_id: &str, ctx: &mut RequestContext) {
            self.record(format!("create_empty:{session_id}"));
            ctx.set_session_id(session_id);
        }

        async fn update(
            &self,
            session_id: &str,
            _user_id: &str,
            _payload: &str,
            _ttl: Duration,
        ) -> Result<(), SessionError> {
            self.record(format!("update:{session_id}"));
            if self.fail_update {
                return Err(SessionError::Backend("scripted update error".to_string()));
            }
            Ok(())
        }

        async fn delete(&self, session_id: &str, _user_id: &str) -> Result<(), SessionError> {
            self.record(format!("delete:{session_id}"));
            if self.fail_delete {
                return Err(SessionError::Backend("scripted delete error".to_string()));
            }
            Ok(())
        }

        async fn revoke(&self, user_id: &str) -> Result<(), SessionError> {
            self.record(format!("revoke:{user_id}"));
            Ok(())
        }

        fn marshal(&self, _ctx: &RequestContext) -> Result<String, SessionError> {
            self.record("marshal".to_string());
            if self.fail_marshal {
                return Err(SessionError::Marshal("scripted marshal error".to_string()));
            }
            Ok(PAYLOAD.to_string())
        }
    }

    fn get_ware(store: Arc<ScriptedStore>) -> SessionGet {
        SessionGet::new(Arc::new(AppConfig::default()), store)
    }

    fn cookie_value(ctx: &RequestContext) -> String {
        let cookie = ctx.queued_cookies().last().expect("cookie queued");
        let (pair, _) = cookie.split_once(';').expect("attributes");
        let (_, value) = pair.split_once('=').expect("name=value");
        value.to_string()
    }

    #[tokio::test]
    async fn get_without_cookie_mints_and_tracks() {
        let store = Arc::new(ScriptedStore::default());
        let mut ctx = RequestContext::new();

        assert!(get_ware(store.clone()).call(&mut ctx).await.is_continue());

        let calls = store.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].starts_with("create_empty:"));
        assert!(ctx.session_id().is_some());
        assert!(ctx.session_user_id().is_none());
        // Cookie value matches the freshly bound id.
        assert_eq!(cookie_value(&ctx), ctx.session_id().unwrap());
    }

    #[tokio::test]
    async fn get_with_unknown_cookie_falls_back_to_fresh_id() {
        let store = Arc::new(ScriptedStore::default());
        let mut ctx = RequestContext::new();
        ctx.set_request_cookie(SESSION_ID, MISSING);

        get_ware(store.clone()).call(&mut ctx).await;

        assert_eq!(
            store.calls(),
            vec![
                format!("read:{MISSING}"),
                format!("create_empty:{}", ctx.session_id().unwrap()),
            ]
        );
        assert_ne!(ctx.session_id().unwrap(), MISSING);
    }

    #[tokio::test]
    async fn get_with_valid_cookie_binds_identity_and_refreshes() {
        let store = Arc::new(ScriptedStore::default());
        let mut ctx = RequestContext::new();
        ctx.set_request_cookie(SESSION_ID, EXISTING);

        get_ware(store.clone()).call(&mut ctx).await;

        assert_eq!(ctx.session_id(), Some(EXISTING));
        assert_eq!(ctx.session_user_id(), Some(USER));
        assert_eq!(cookie_value(&ctx), EXISTING);
        assert_eq!(
            store.calls(),
            vec![
                format!("read:{EXISTING}"),
                format!("create:{EXISTING}"),
                format!("update:{EXISTING}"),
            ]
        );
    }

    #[tokio::test]
    async fn get_is_idempotent_for_a_valid_cookie() {
        let store = Arc::new(ScriptedStore::default());
        let ware = get_ware(store.clone());
        let mut bindings = Vec::new();
        for _ in 0..2 {
            let mut ctx = RequestContext::new();
            ctx.set_request_cookie(SESSION_ID, EXISTING);
            ware.call(&mut ctx).await;
            bindings.push((
                ctx.session_id().unwrap().to_string(),
                ctx.session_user_id().unwrap().to_string(),
            ));
        }
        assert_eq!(bindings[0], bindings[1]);
    }

    #[tokio::test]
    async fn get_respects_refresh_opt_out() {
        let store = Arc::new(ScriptedStore::default());
        let mut ctx = RequestContext::new();
        ctx.set_request_cookie(SESSION_ID, EXISTING);
        ctx.set_session_refresh(false);

        get_ware(store.clone()).call(&mut ctx).await;

        assert!(ctx.queued_cookies().is_empty());
        assert!(!store.calls().iter().any(|call| call.starts_with("update:")));
    }

    #[tokio::test]
    async fn get_survives_refresh_update_failure() {
        let store = Arc::new(ScriptedStore {
            fail_update: true,
            ..ScriptedStore::default()
        });
        let mut ctx = RequestContext::new();
        ctx.set_request_cookie(SESSION_ID, EXISTING);

        assert!(get_ware(store).call(&mut ctx).await.is_continue());
        assert_eq!(ctx.session_id(), Some(EXISTING));
        assert_eq!(ctx.session_user_id(), Some(USER));
    }

    #[tokio::test]
    async fn get_mints_fresh_id_when_create_fails() {
        let store = Arc::new(ScriptedStore {
            fail_create: true,
            ..ScriptedStore::default()
        });
        let mut ctx = RequestContext::new();
        ctx.set_request_cookie(SESSION_ID, EXISTING);

        assert!(get_ware(store.clone()).call(&mut ctx).await.is_continue());

        // The suspect record gets a best-effort delete, then a fresh id.
        assert!(store.calls().contains(&format!("delete:{EXISTING}")));
        assert_ne!(ctx.session_id().unwrap(), EXISTING);
        assert_ne!(cookie_value(&ctx), EXISTING);
        assert!(ctx.session_user_id().is_none());
    }

    #[tokio::test]
    async fn get_mints_fresh_id_even_when_cleanup_delete_fails() {
        let store = Arc::new(ScriptedStore {
            fail_create: true,
            fail_delete: true,
            ..ScriptedStore::default()
        });
        let mut ctx = RequestContext::new();
        ctx.set_request_cookie(SESSION_ID, EXISTING);

        assert!(get_ware(store.clone()).call(&mut ctx).await.is_continue());
        assert_ne!(cookie_value(&ctx), EXISTING);
        assert!(ctx.session_id().is_some());
    }

    #[tokio::test]
    async fn del_requires_wired_identity() {
        let store = Arc::new(ScriptedStore::default());
        let ware = SessionDel::new(Arc::new(AppConfig::default()), store.clone());

        let mut ctx = RequestContext::new();
        match ware.call(&mut ctx).await {
            Disposition::Halt(response) => {
                assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(response.envelope.message, ErrorKind::Generic.message());
            }
            Disposition::Continue => panic!("expected halt"),
        }

        let mut ctx = RequestContext::new();
        ctx.set_session_id(EXISTING);
        match ware.call(&mut ctx).await {
            Disposition::Halt(response) => {
                assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
            }
            Disposition::Continue => panic!("expected halt"),
        }
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn del_propagates_store_failure() {
        let store = Arc::new(ScriptedStore {
            fail_delete: true,
            ..ScriptedStore::default()
        });
        let ware = SessionDel::new(Arc::new(AppConfig::default()), store);
        let mut ctx = RequestContext::new();
        ctx.set_session_id(EXISTING);
        ctx.set_session_user_id(USER);

        match ware.call(&mut ctx).await {
            Disposition::Halt(response) => {
                assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
                // Store detail is unsafe by default.
                assert_eq!(response.envelope.message, ErrorKind::Generic.message());
            }
            Disposition::Continue => panic!("expected halt"),
        }
    }

    #[tokio::test]
    async fn del_proceeds_on_success() {
        let store = Arc::new(ScriptedStore::default());
        let ware = SessionDel::new(Arc::new(AppConfig::default()), store.clone());
        let mut ctx = RequestContext::new();
        ctx.set_session_id(EXISTING);
        ctx.set_session_user_id(USER);

        assert!(ware.call(&mut ctx).await.is_continue());
        assert_eq!(store.calls(), vec![format!("delete:{EXISTING}")]);
    }

    #[tokio::test]
    async fn set_persists_marshaled_payload() {
        let store = Arc::new(ScriptedStore::default());
        let ware = SessionSet::new(Arc::new(AppConfig::default()), store.clone());
        let mut ctx = RequestContext::new();
        ctx.set_session_id(EXISTING);
        ctx.set_session_user_id(USER);

        assert!(ware.call(&mut ctx).await.is_continue());
        assert_eq!(
            store.calls(),
            vec!["marshal".to_string(), format!("update:{EXISTING}")]
        );
    }

    #[tokio::test]
    async fn set_fails_on_marshal_error() {
        let store = Arc::new(ScriptedStore {
            fail_marshal: true,
            ..ScriptedStore::default()
        });
        let ware = SessionSet::new(Arc::new(AppConfig::default()), store);
        let mut ctx = RequestContext::new();
        ctx.set_session_id(EXISTING);
        ctx.set_session_user_id(USER);

        match ware.call(&mut ctx).await {
            Disposition::Halt(response) => {
                assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
            }
            Disposition::Continue => panic!("expected halt"),
        }
    }

    #[tokio::test]
    async fn set_requires_wired_identity() {
        let store = Arc::new(ScriptedStore::default());
        let ware = SessionSet::new(Arc::new(AppConfig::default()), store.clone());
        let mut ctx = RequestContext::new();

        match ware.call(&mut ctx).await {
            Disposition::Halt(response) => {
                assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
            }
            Disposition::Continue => panic!("expected halt"),
        }
        assert_eq!(store.calls(), vec!["marshal".to_string()]);
    }

    #[tokio::test]
    async fn set_propagates_update_failure() {
        let store = Arc::new(ScriptedStore {
            fail_update: true,
            ..ScriptedStore::default()
        });
        let ware = SessionSet::new(Arc::new(AppConfig::default()), store);
        let mut ctx = RequestContext::new();
        ctx.set_session_id(EXISTING);
        ctx.set_session_user_id(USER);

        match ware.call(&mut ctx).await {
            Disposition::Halt(response) => {
                assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
            }
            Disposition::Continue => panic!("expected halt"),
        }
    }
}
