//! Session lifecycle: pluggable store contract, lifecycle wares, and the
//! in-memory reference backend.

pub mod memory;
pub mod store;
pub mod wares;

pub use memory::InMemorySessionStore;
pub use store::{SessionError, SessionRecord, SessionStore};
pub use wares::{SessionDel, SessionGet, SessionSet};
