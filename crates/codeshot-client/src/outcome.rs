use codeshot_api_types::{IMAGE_CONTENT_TYPE, RenderFailure};

use crate::transport::RawResponse;

/// Everything a render request can resolve to, as seen by the controller.
///
/// The set is closed so dispatch over it is total: silent fall-through on an
/// unrecognized content type or a dead connection is not representable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Raw PNG bytes, announced as `image/png;base64` on the wire.
    Image(Vec<u8>),
    /// The server rendered nothing and said why.
    Failure(String),
    /// The response carried a content type outside the wire contract.
    UnexpectedContentType(String),
    /// The request never produced a usable response.
    Transport(String),
}

impl RenderOutcome {
    /// Classify a raw response by its declared content type, exactly as the
    /// wire contract demands.
    pub fn classify(response: RawResponse) -> Self {
        let content_type = response.content_type.unwrap_or_default();

        if content_type == IMAGE_CONTENT_TYPE {
            return Self::Image(response.body);
        }

        if content_type.starts_with("application/json") {
            return match serde_json::from_slice::<RenderFailure>(&response.body) {
                Ok(failure) => Self::Failure(failure.reason),
                Err(err) => Self::Transport(format!("malformed failure body: {err}")),
            };
        }

        Self::UnexpectedContentType(content_type)
    }
}
