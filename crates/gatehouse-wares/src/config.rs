//! Application configuration consumed by the wares

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Caller-supplied safe/unsafe classifier consulted per error instance.
///
/// Returning `Some(message)` marks the error safe and supplies the exact text
/// rendered to the client; `None` falls through to the default policy.
pub type SafeErrorFilter =
    Arc<dyn Fn(&(dyn std::error::Error + Send + Sync)) -> Option<String> + Send + Sync>;

/// Configuration shared by all wares of an application.
#[derive(Clone)]
pub struct AppConfig {
    /// When true, raw internal error text is rendered to clients.
    pub debug: bool,
    /// Path attribute for the session cookie; empty means "/".
    pub cookie_path: String,
    /// TTL for the transport-level session cookie.
    pub cookie_ttl: Duration,
    /// TTL for the persisted session record, independent of the cookie.
    pub session_ttl: Duration,
    /// Optional per-error safe classification override.
    pub safe_error_filter: Option<SafeErrorFilter>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            debug: false,
            cookie_path: "/".to_string(),
            cookie_ttl: Duration::from_secs(30 * 24 * 60 * 60), // 30 days
            session_ttl: Duration::from_secs(30 * 60),          // 30 minutes
            safe_error_filter: None,
        }
    }
}

impl AppConfig {
    /// Default configuration with the given debug mode.
    pub fn new(debug: bool) -> Self {
        Self {
            debug,
            ..Self::default()
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("debug", &self.debug)
            .field("cookie_path", &self.cookie_path)
            .field("cookie_ttl", &self.cookie_ttl)
            .field("session_ttl", &self.session_ttl)
            .field("safe_error_filter", &self.safe_error_filter.is_some())
            .finish()
    }
}
