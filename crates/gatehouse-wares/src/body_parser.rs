//! Request-body decode gate
//!
//! Validates that a decode destination was pre-registered on the context and
//! that the inbound payload is well-formed before invoking its [`Populate`]
//! contract. A missing destination is a server wiring bug (500), never a
//! client error; everything about a malformed body is safe to disclose.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use hyper::StatusCode;

use crate::config::AppConfig;
use crate::context::{BoxError, RequestContext};
use crate::errors::{ErrorKind, safe_error_message};
use crate::ware::{Disposition, Ware};

/// Populate-from-raw-bytes capability of a decode destination.
///
/// Implementors are plain request-body types; they are registered on the
/// context by an application ware ahead of [`BodyParser`] and read back by
/// the endpoint afterwards.
///
/// # Examples
///
/// ```rust
/// use gatehouse_wares::Populate;
/// use serde::Deserialize;
///
/// #[derive(Default, Deserialize)]
/// struct LoginBody {
///     name: String,
/// }
///
/// impl Populate for LoginBody {
///     fn populate(&mut self, body: &[u8]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
///         *self = serde_json::from_slice(body)?;
///         Ok(())
///     }
/// }
/// ```
pub trait Populate: Any + Send {
    fn populate(&mut self, body: &[u8]) -> Result<(), BoxError>;
}

impl dyn Populate {
    /// Borrow the destination back as its concrete type.
    pub fn downcast_ref<T: Populate>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Populate>(&mut self) -> Option<&mut T> {
        (self as &mut dyn Any).downcast_mut::<T>()
    }
}

/// Ware invoking the registered destination's decode contract.
pub struct BodyParser {
    config: Arc<AppConfig>,
}

impl BodyParser {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Ware for BodyParser {
    async fn call(&self, ctx: &mut RequestContext) -> Disposition {
        let Some(mut destination) = ctx.take_decode_destination() else {
            ctx.set_last_error("body parser ware has no registered decode destination".to_string());
            let message = safe_error_message(&self.config, ctx, ErrorKind::Parse);
            return Disposition::halt(StatusCode::INTERNAL_SERVER_ERROR, message);
        };
        let Some(body) = ctx.body().cloned() else {
            ctx.set_safe_error(format!("{}: body is empty", ErrorKind::Parse));
            let message = safe_error_message(&self.config, ctx, ErrorKind::Parse);
            return Disposition::halt(StatusCode::BAD_REQUEST, message);
        };
        if let Err(err) = destination.populate(&body) {
            // Decode errors concern client-supplied structure and are safe.
            ctx.set_safe_error(format!("{}: {}", ErrorKind::Parse, err));
            let message = safe_error_message(&self.config, ctx, ErrorKind::Parse);
            return Disposition::halt(StatusCode::BAD_REQUEST, message);
        }
        ctx.set_decode_destination(destination);
        Disposition::Continue
    }
}
