//! Authentication gate
//!
//! Identifies *who* only; authorization is out of scope. A request without a
//! resolved session user is rejected before the endpoint runs.

use async_trait::async_trait;
use hyper::StatusCode;

use crate::context::RequestContext;
use crate::errors::ErrorKind;
use crate::ware::{Disposition, Ware};

/// Ware rejecting requests whose context carries no authenticated identity.
#[derive(Default)]
pub struct Authenticate;

impl Authenticate {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Ware for Authenticate {
    async fn call(&self, ctx: &mut RequestContext) -> Disposition {
        match ctx.session_user_id() {
            Some(user_id) if !user_id.is_empty() => Disposition::Continue,
            _ => Disposition::halt(StatusCode::UNAUTHORIZED, ErrorKind::Unauthorized.message()),
        }
    }
}
