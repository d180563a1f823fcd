//! Ware chain execution
//!
//! A [`WareStack`] is an ordered sequence of wares selected for one
//! method/path by the host router. Wares execute sequentially; the first one
//! that halts decides the response and no later ware runs.
//!
//! # Examples
//!
//! ```rust,no_run
//! use gatehouse_wares::{Authenticate, Disposition, RequestContext, Ware, WareStack};
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct Profile;
//!
//! #[async_trait]
//! impl Ware for Profile {
//!     async fn call(&self, ctx: &mut RequestContext) -> Disposition {
//!         Disposition::respond(Some(serde_json::json!({
//!             "user": ctx.session_user_id(),
//!         })))
//!     }
//! }
//!
//! let mut stack = WareStack::new();
//! stack.push(Arc::new(Authenticate::new()));
//! stack.push(Arc::new(Profile));
//! ```

use std::sync::Arc;

use bytes::Bytes;
use http::HeaderMap;
use http::Response;
use http_body_util::Full;
use hyper::StatusCode;
use tracing::{debug, warn};

use crate::context::RequestContext;
use crate::errors::ErrorKind;
use crate::response::WareResponse;
use crate::ware::{Disposition, Ware};

/// Ordered collection of wares with short-circuit execution.
#[derive(Default, Clone)]
pub struct WareStack {
    wares: Vec<Arc<dyn Ware>>,
}

impl WareStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a ware; wares run in push order.
    pub fn push(&mut self, ware: Arc<dyn Ware>) {
        self.wares.push(ware);
    }

    pub fn len(&self) -> usize {
        self.wares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wares.is_empty()
    }

    /// Run the chain to its terminal response.
    ///
    /// A chain that finishes without any ware halting is a wiring defect; it
    /// renders as a generic 404 rather than an empty reply.
    pub async fn run(&self, ctx: &mut RequestContext) -> WareResponse {
        for (index, ware) in self.wares.iter().enumerate() {
            match ware.call(ctx).await {
                Disposition::Continue => continue,
                Disposition::Halt(response) => {
                    debug!(
                        ware = index,
                        status = %response.status,
                        "ware chain terminated"
                    );
                    return response;
                }
            }
        }
        warn!("ware chain finished without a terminal response");
        WareResponse::failure(StatusCode::NOT_FOUND, ErrorKind::NotFound.message())
    }

    /// Build a context from request headers and collected body bytes, run the
    /// chain, and render the HTTP response including queued cookies.
    pub async fn handle(&self, headers: &HeaderMap, body: Option<Bytes>) -> Response<Full<Bytes>> {
        let mut ctx = RequestContext::from_parts(headers, body);
        let response = self.run(&mut ctx).await;
        response.into_http(&ctx)
    }
}
