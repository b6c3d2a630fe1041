use thiserror::Error;

pub use codeshot_api_types::RenderRequest;

/// Encoded render result returned to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub width: u32,
    pub height: u32,
    /// PNG-encoded pixels, ready to be written to the wire.
    pub png: Vec<u8>,
}

/// Structured errors surfaced by the rendering pipeline. These map to the
/// single in-band `{"reason"}` failure at the HTTP boundary.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("{message}")]
    Args { message: String },
    #[error("invalid render options: {message}")]
    Options { message: String },
    #[error("syntax highlighting failed: {language}: {message}")]
    Highlighting { language: String, message: String },
    #[error("font unavailable: {message}")]
    Font { message: String },
    #[error("image encoding failed: {message}")]
    Encode { message: String },
}

impl RenderError {
    pub fn args(message: impl Into<String>) -> Self {
        Self::Args {
            message: message.into(),
        }
    }

    pub fn options(message: impl Into<String>) -> Self {
        Self::Options {
            message: message.into(),
        }
    }

    pub fn font(message: impl Into<String>) -> Self {
        Self::Font {
            message: message.into(),
        }
    }

    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode {
            message: message.into(),
        }
    }
}

/// Trait exposed by the rendering pipeline. Implementations must be pure and
/// deterministic: given the same input, they return identical outputs or
/// errors.
pub trait RenderService: Send + Sync {
    fn render(&self, request: &RenderRequest) -> Result<RenderedImage, RenderError>;
}
