//! Wire types shared between the codeshot server and its clients.
//!
//! The render endpoint discriminates success from failure at the transport
//! level: a successful render is returned with [`IMAGE_CONTENT_TYPE`] and a
//! raw PNG body, a failure with [`JSON_CONTENT_TYPE`] and a [`RenderFailure`]
//! body. Both outcomes use HTTP 200; clients must dispatch on the
//! `Content-Type` header, not the status code.

use serde::{Deserialize, Serialize};

/// Content type announced for successful renders.
///
/// The name is historical: the body is the raw PNG bytes, not base64 text.
/// Clients perform the base64 encoding themselves when they need a data URI.
/// The label is preserved verbatim for wire compatibility.
pub const IMAGE_CONTENT_TYPE: &str = "image/png;base64";

/// Content type announced for render failures.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Body of `POST /code/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Rendering options as a JSON-encoded string, opaque at this layer.
    /// Line (`//`) and block (`/* */`) comments are tolerated by the server.
    pub args: String,
    /// The source code to render.
    pub code: String,
}

impl RenderRequest {
    pub fn new(args: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            args: args.into(),
            code: code.into(),
        }
    }
}

/// JSON body returned when rendering fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderFailure {
    /// Human-readable description of why rendering failed, surfaced verbatim
    /// to the user.
    pub reason: String,
}

impl RenderFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_request_round_trips_through_json() {
        let request = RenderRequest::new("{\"language\": \"rust\"}", "fn main() {}");
        let encoded = serde_json::to_string(&request).expect("serialize");
        let decoded: RenderRequest = serde_json::from_str(&encoded).expect("deserialize");
        assert_eq!(decoded, request);
    }

    #[test]
    fn render_failure_uses_reason_field() {
        let failure = RenderFailure::new("bad token");
        let encoded = serde_json::to_value(&failure).expect("serialize");
        assert_eq!(encoded["reason"], "bad token");
    }
}
