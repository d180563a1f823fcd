//! # Gatehouse wares
//!
//! A chain of request-processing stages ("wares") implementing cross-cutting
//! concerns for an HTTP service: authentication gating, double-submit CSRF
//! validation, request-body decoding, session lifecycle management, and
//! uniform error responses with safety filtering.
//!
//! Routing, transport, and persistence backends are external collaborators:
//! the host router selects a [`WareStack`] per method/path, the transport
//! collects the body and writes the rendered response, and any store
//! implementing [`SessionStore`] can back the session wares. An in-memory
//! backend ships for development and testing.
//!
//! ## Control flow
//!
//! Each ware receives the shared [`RequestContext`] and returns a
//! [`Disposition`]: continue to the next ware, or halt the chain with a
//! terminal response. No failure escapes a ware as an unhandled error; every
//! failure path is converted into a response through the safety filter in
//! [`errors`] before the chain is abandoned.

pub mod authenticate;
pub mod body_parser;
pub mod config;
pub mod context;
pub mod cookie;
pub mod csrf;
pub mod errors;
pub mod response;
pub mod session;
pub mod stack;
pub mod ware;

#[cfg(test)]
mod tests;

pub use authenticate::Authenticate;
pub use body_parser::{BodyParser, Populate};
pub use config::{AppConfig, SafeErrorFilter};
pub use context::{BoxError, RequestContext, SESSION_ID};
pub use csrf::Csrf;
pub use errors::{ErrorKind, ErrorWare, safe_error_message};
pub use response::{Envelope, WareResponse};
pub use session::{
    InMemorySessionStore, SessionDel, SessionError, SessionGet, SessionRecord, SessionSet,
    SessionStore,
};
pub use stack::WareStack;
pub use ware::{Disposition, Ware};
