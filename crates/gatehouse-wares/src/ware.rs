//! Core ware trait
//!
//! A ware is one unit in an ordered request-processing chain. Each ware
//! receives the shared [`RequestContext`] and either continues to the next
//! ware or terminates the chain with a response. Termination is an explicit
//! control-flow result, not a side effect into a shared writer.
//!
//! # Examples
//!
//! ```rust,no_run
//! use gatehouse_wares::{Disposition, RequestContext, Ware};
//! use async_trait::async_trait;
//! use hyper::StatusCode;
//!
//! struct RequireFlag;
//!
//! #[async_trait]
//! impl Ware for RequireFlag {
//!     async fn call(&self, ctx: &mut RequestContext) -> Disposition {
//!         match ctx.value("flag") {
//!             Some(_) => Disposition::Continue,
//!             None => Disposition::halt(StatusCode::BAD_REQUEST, "missing flag"),
//!         }
//!     }
//! }
//! ```

use async_trait::async_trait;
use hyper::StatusCode;
use serde_json::Value;

use crate::context::RequestContext;
use crate::response::WareResponse;

/// Result of one ware invocation.
#[derive(Debug)]
pub enum Disposition {
    /// Proceed to the next ware in the chain.
    Continue,
    /// Terminate the chain with this response; subsequent wares never run.
    Halt(WareResponse),
}

impl Disposition {
    /// Terminate with a failure envelope.
    pub fn halt(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Halt(WareResponse::failure(status, message))
    }

    /// Terminate with a success envelope and optional data payload.
    pub fn respond(data: Option<Value>) -> Self {
        Self::Halt(WareResponse::success(data))
    }

    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue)
    }
}

/// One stage of the request-processing chain.
///
/// Wares execute sequentially per request; all context writes by a prior
/// ware are visible to every subsequent ware in the same chain.
#[async_trait]
pub trait Ware: Send + Sync {
    async fn call(&self, ctx: &mut RequestContext) -> Disposition;
}
