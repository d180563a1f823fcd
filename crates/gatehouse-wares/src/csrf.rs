//! Double-submit CSRF validation
//!
//! The request body must carry the session token under the same field name
//! as the session cookie; it is compared against the session identifier an
//! earlier ware resolved onto the context. The submitted token is never
//! echoed back on mismatch.

use async_trait::async_trait;
use hyper::StatusCode;
use serde::Deserialize;

use crate::context::RequestContext;
use crate::errors::ErrorKind;
use crate::ware::{Disposition, Ware};

/// Smallest well-formed JSON body is `{}`.
const MIN_BODY_LEN: usize = 2;

#[derive(Deserialize)]
struct PostBody {
    #[serde(default)]
    sessionid: String,
}

/// Ware performing the double-submit check.
///
/// All of its messages are fixed kind texts, so it takes no configuration.
#[derive(Default)]
pub struct Csrf;

impl Csrf {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Ware for Csrf {
    async fn call(&self, ctx: &mut RequestContext) -> Disposition {
        // The body stays on the context untouched; later wares re-read it.
        let Some(body) = ctx.body().cloned() else {
            return Disposition::halt(StatusCode::BAD_REQUEST, ErrorKind::Csrf.message());
        };
        if body.len() < MIN_BODY_LEN {
            return Disposition::halt(StatusCode::BAD_REQUEST, ErrorKind::Parse.message());
        }
        let parsed: PostBody = match serde_json::from_slice(&body) {
            Ok(parsed) => parsed,
            Err(err) => {
                // Parser detail concerns client-supplied structure: safe.
                let message = format!("{}: {}", ErrorKind::Parse, err);
                return Disposition::halt(StatusCode::BAD_REQUEST, message);
            }
        };
        match ctx.session_id() {
            Some(session_id) if session_id == parsed.sessionid => Disposition::Continue,
            _ => Disposition::halt(StatusCode::BAD_REQUEST, ErrorKind::Csrf.message()),
        }
    }
}
