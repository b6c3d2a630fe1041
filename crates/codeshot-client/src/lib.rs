//! Native page controller for the codeshot render workflow.
//!
//! This crate mirrors the browser page's observable behavior behind explicit
//! seams: a [`Transport`] carries the two network calls (render, default
//! options), a [`ControllerView`] stands in for the page's DOM elements, and
//! [`PageController`] orchestrates the single user-facing action: show code
//! as an image, or show why it failed.
//!
//! Unlike the page it mirrors, the controller's response dispatch is total:
//! every [`RenderOutcome`] variant, including transport failures and
//! unexpected content types, drives an explicit view update. Submission is
//! guarded by an in-flight flag released on every exit path, so a second
//! submit while one is pending is rejected instead of racing.

mod controller;
mod outcome;
mod transport;
mod view;

pub use codeshot_api_types as api_types;
pub use controller::{
    DOWNLOAD_FILE_NAME, DownloadError, PageController, SubmitError, png_data_uri,
};
pub use outcome::RenderOutcome;
pub use transport::{HttpTransport, RawResponse, Transport, TransportError};
pub use view::ControllerView;
