//! Cookie header parsing and `Set-Cookie` formatting
//!
//! Only the subset the session wares need: a name/value map from the request
//! `Cookie` header, and a `Set-Cookie` line carrying `Path`, `Max-Age` and
//! `HttpOnly` for the session identifier.

use std::collections::HashMap;
use std::time::Duration;

use http::HeaderMap;
use http::header::COOKIE;

/// Parse all `Cookie` request headers into a name/value map.
///
/// Malformed pairs (no `=`) and headers with non-visible-ASCII bytes are
/// skipped rather than rejected; a bad cookie reads as an absent cookie.
pub fn parse(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Format a `Set-Cookie` value. An empty `path` defaults to "/".
pub fn format(name: &str, value: &str, path: &str, max_age: Duration) -> String {
    let path = if path.is_empty() { "/" } else { path };
    format!(
        "{}={}; Path={}; Max-Age={}; HttpOnly",
        name,
        value,
        path,
        max_age.as_secs()
    )
}
