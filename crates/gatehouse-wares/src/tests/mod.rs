//! Cross-ware integration tests
//!
//! Exercise whole chains against the in-memory store the way an application
//! wires them, end to end from request headers to rendered HTTP response.
