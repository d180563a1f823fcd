//! Per-request context carried through a ware chain
//!
//! The context is exclusively owned by one pipeline invocation and discarded
//! at request end. Well-known session fields are strongly typed; arbitrary
//! caller-defined values go through the string-keyed [`Value`] map.
//!
//! # Examples
//!
//! ```rust
//! use gatehouse_wares::RequestContext;
//! use serde_json::json;
//!
//! let mut ctx = RequestContext::new();
//! ctx.set_session_id("SOME-SESSION-ID");
//! ctx.set_value("flagged", json!(true));
//!
//! assert_eq!(ctx.session_id(), Some("SOME-SESSION-ID"));
//! assert!(ctx.session_user_id().is_none());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use http::HeaderMap;
use serde_json::Value;

use crate::body_parser::Populate;
use crate::cookie;

/// Name of the session cookie and of the CSRF post-body token field.
pub const SESSION_ID: &str = "sessionid";

/// Boxed internal error carried on the context for diagnostics.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Mutable request-scoped state shared by all wares in one chain.
///
/// Absent session fields mean "unauthenticated", never a crash condition:
/// wares that need them must halt with a response instead of panicking.
#[derive(Default)]
pub struct RequestContext {
    session_id: Option<String>,
    session_user_id: Option<String>,
    /// Unset means refresh (the default); `Some(false)` suppresses it.
    session_refresh: Option<bool>,
    /// Opaque session cargo; the core never inspects its structure.
    session_payload: Option<Value>,
    body: Option<Bytes>,
    decode_destination: Option<Box<dyn Populate>>,
    last_error: Option<BoxError>,
    safe_error: Option<BoxError>,
    cookies: HashMap<String, String>,
    queued_cookies: Vec<String>,
    values: HashMap<String, Value>,
}

impl RequestContext {
    /// Create an empty context, detached from any HTTP request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from request headers and an already-collected body.
    ///
    /// An empty body is treated as no body at all, matching transports that
    /// hand over a zero-length stream for bodyless requests.
    pub fn from_parts(headers: &HeaderMap, body: Option<Bytes>) -> Self {
        Self {
            cookies: cookie::parse(headers),
            body: body.filter(|bytes| !bytes.is_empty()),
            ..Self::default()
        }
    }

    // ------------------------------------------------------------------
    // Session identity
    // ------------------------------------------------------------------

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn set_session_id(&mut self, session_id: impl Into<String>) {
        self.session_id = Some(session_id.into());
    }

    pub fn clear_session_id(&mut self) {
        self.session_id = None;
    }

    pub fn session_user_id(&self) -> Option<&str> {
        self.session_user_id.as_deref()
    }

    pub fn set_session_user_id(&mut self, user_id: impl Into<String>) {
        self.session_user_id = Some(user_id.into());
    }

    pub fn clear_session_user_id(&mut self) {
        self.session_user_id = None;
    }

    /// Refresh flag consumed by the session Get flow; `None` defaults to true.
    pub fn session_refresh(&self) -> Option<bool> {
        self.session_refresh
    }

    pub fn set_session_refresh(&mut self, refresh: bool) {
        self.session_refresh = Some(refresh);
    }

    pub fn session_payload(&self) -> Option<&Value> {
        self.session_payload.as_ref()
    }

    pub fn set_session_payload(&mut self, payload: Value) {
        self.session_payload = Some(payload);
    }

    // ------------------------------------------------------------------
    // Request body and decode destination
    // ------------------------------------------------------------------

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn set_body(&mut self, body: Bytes) {
        self.body = if body.is_empty() { None } else { Some(body) };
    }

    pub fn decode_destination(&self) -> Option<&dyn Populate> {
        self.decode_destination.as_deref()
    }

    pub fn set_decode_destination(&mut self, destination: Box<dyn Populate>) {
        self.decode_destination = Some(destination);
    }

    pub fn take_decode_destination(&mut self) -> Option<Box<dyn Populate>> {
        self.decode_destination.take()
    }

    // ------------------------------------------------------------------
    // Error carriage for the safety filter
    // ------------------------------------------------------------------

    /// Internal error recorded for diagnostics; unsafe to disclose unless the
    /// configured filter or debug mode says otherwise.
    pub fn last_error(&self) -> Option<&(dyn std::error::Error + Send + Sync)> {
        self.last_error.as_deref()
    }

    pub fn set_last_error(&mut self, err: impl Into<BoxError>) {
        self.last_error = Some(err.into());
    }

    /// Error explicitly marked safe by the producing ware; its text may reach
    /// the client verbatim.
    pub fn safe_error(&self) -> Option<&(dyn std::error::Error + Send + Sync)> {
        self.safe_error.as_deref()
    }

    pub fn set_safe_error(&mut self, err: impl Into<BoxError>) {
        self.safe_error = Some(err.into());
    }

    // ------------------------------------------------------------------
    // Cookies
    // ------------------------------------------------------------------

    /// Value of an incoming request cookie.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn set_request_cookie(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    /// Queue a `Set-Cookie` header for the response. An empty path is written
    /// as "/".
    pub fn set_cookie(&mut self, path: &str, name: &str, value: &str, max_age: Duration) {
        self.queued_cookies
            .push(cookie::format(name, value, path, max_age));
    }

    /// Cookies queued for the response, in write order.
    pub fn queued_cookies(&self) -> &[String] {
        &self.queued_cookies
    }

    // ------------------------------------------------------------------
    // Dynamic values
    // ------------------------------------------------------------------

    /// Caller-defined value by key.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn set_value(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("session_id", &self.session_id)
            .field("session_user_id", &self.session_user_id)
            .field("session_refresh", &self.session_refresh)
            .field("body_len", &self.body.as_ref().map(Bytes::len))
            .field("has_decode_destination", &self.decode_destination.is_some())
            .field("last_error", &self.last_error.as_ref().map(|e| e.to_string()))
            .field("safe_error", &self.safe_error.as_ref().map(|e| e.to_string()))
            .field("cookies", &self.cookies)
            .field("queued_cookies", &self.queued_cookies)
            .field("values", &self.values)
            .finish()
    }
}
