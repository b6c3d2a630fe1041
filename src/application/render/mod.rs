//! Code-to-image rendering pipeline.
//!
//! The pipeline is pure and deterministic: it accepts the raw `{args, code}`
//! request, parses the comment-tolerant options JSON, highlights the code
//! with syntect, rasterizes it with fontdue onto an image-crate canvas and
//! returns encoded PNG bytes. State (metrics, logging, HTTP envelopes) lives
//! in the caller.

mod options;
mod service;
mod types;

pub use options::RenderOptions;
pub use service::{CodeImageRenderer, locate_font};
pub use types::{RenderError, RenderService, RenderedImage};
