//! Error kinds, the safety filter, and terminal error-responder wares
//!
//! Every failure path produces an internal error (for diagnostics, carried on
//! the context) and a message policy deciding what reaches the client:
//!
//! 1. A configured [`SafeErrorFilter`] is consulted first against the
//!    context's last error; a non-`None` result is rendered verbatim.
//! 2. An error explicitly marked safe by the producing ware is rendered
//!    verbatim.
//! 3. In debug mode the raw internal error text is rendered regardless.
//! 4. Otherwise a generic, kind-specific message is rendered.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use hyper::StatusCode;

use crate::config::AppConfig;
use crate::context::RequestContext;
use crate::ware::{Disposition, Ware};

/// Classification of a failure, each with a fixed generic client message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Generic,
    Parse,
    Csrf,
    Unauthorized,
    MethodNotAllowed,
    NotFound,
}

impl ErrorKind {
    /// Generic message safe to show for this kind.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Generic => "something went wrong",
            Self::Parse => "the request body could not be parsed",
            Self::Csrf => "the session token is invalid",
            Self::Unauthorized => "this request is unauthorized",
            Self::MethodNotAllowed => "this method is not allowed",
            Self::NotFound => "the requested resource was not found",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Render the client-facing message for the current failure.
///
/// `kind` supplies the generic fallback text when neither the filter, an
/// explicit safe marking, nor debug mode permits more detail.
pub fn safe_error_message(config: &AppConfig, ctx: &RequestContext, kind: ErrorKind) -> String {
    if let Some(filter) = &config.safe_error_filter
        && let Some(err) = ctx.last_error()
        && let Some(safe) = filter(err)
    {
        return safe;
    }
    if let Some(safe) = ctx.safe_error() {
        return safe.to_string();
    }
    if config.debug && let Some(err) = ctx.last_error() {
        return err.to_string();
    }
    kind.message().to_string()
}

/// Terminal ware rendering a fixed-status error response through the safety
/// filter. Used directly for unmatched routes and as the tail of chains that
/// record an error on the context before delegating here.
pub struct ErrorWare {
    config: Arc<AppConfig>,
    status: StatusCode,
    kind: ErrorKind,
}

impl ErrorWare {
    pub fn bad_request(config: Arc<AppConfig>) -> Self {
        Self {
            config,
            status: StatusCode::BAD_REQUEST,
            kind: ErrorKind::Generic,
        }
    }

    pub fn conflict(config: Arc<AppConfig>) -> Self {
        Self {
            config,
            status: StatusCode::CONFLICT,
            kind: ErrorKind::Generic,
        }
    }

    pub fn method_not_allowed(config: Arc<AppConfig>) -> Self {
        Self {
            config,
            status: StatusCode::METHOD_NOT_ALLOWED,
            kind: ErrorKind::MethodNotAllowed,
        }
    }

    pub fn not_found(config: Arc<AppConfig>) -> Self {
        Self {
            config,
            status: StatusCode::NOT_FOUND,
            kind: ErrorKind::NotFound,
        }
    }

    pub fn server_error(config: Arc<AppConfig>) -> Self {
        Self {
            config,
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: ErrorKind::Generic,
        }
    }

    pub fn unauthorized(config: Arc<AppConfig>) -> Self {
        Self {
            config,
            status: StatusCode::UNAUTHORIZED,
            kind: ErrorKind::Unauthorized,
        }
    }
}

#[async_trait]
impl Ware for ErrorWare {
    async fn call(&self, ctx: &mut RequestContext) -> Disposition {
        let message = safe_error_message(&self.config, ctx, self.kind);
        Disposition::halt(self.status, message)
    }
}
