//! Uniform response envelope
//!
//! Every terminal response carries `{success, message, data}` plus an HTTP
//! status code. All error paths set `success=false`, a non-empty message and
//! no data payload.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, SET_COOKIE};
use http::{HeaderValue, Response, StatusCode};
use http_body_util::Full;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;

use crate::context::RequestContext;

/// JSON body shared by every response the wares produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A terminal response chosen by a ware: status code plus envelope.
#[derive(Debug, Clone)]
pub struct WareResponse {
    pub status: StatusCode,
    pub envelope: Envelope,
}

impl WareResponse {
    /// Failure response: `success=false`, no data.
    pub fn failure(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            envelope: Envelope {
                success: false,
                message: message.into(),
                data: None,
            },
        }
    }

    /// Success response: 200, empty message, optional data payload.
    pub fn success(data: Option<Value>) -> Self {
        Self {
            status: StatusCode::OK,
            envelope: Envelope {
                success: true,
                message: String::new(),
                data,
            },
        }
    }

    /// Render as an HTTP response, attaching any cookies queued on the
    /// context during the chain.
    pub fn into_http(self, ctx: &RequestContext) -> Response<Full<Bytes>> {
        let body = serde_json::to_vec(&self.envelope).unwrap_or_else(|err| {
            error!(error = %err, "failed to serialize response envelope");
            br#"{"success":false,"message":"something went wrong"}"#.to_vec()
        });

        let mut response = Response::new(Full::new(Bytes::from(body)));
        *response.status_mut() = self.status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for cookie in ctx.queued_cookies() {
            match HeaderValue::from_str(cookie) {
                Ok(value) => {
                    response.headers_mut().append(SET_COOKIE, value);
                }
                Err(err) => error!(error = %err, "skipping unencodable Set-Cookie header"),
            }
        }
        response
    }
}
