//! codeshot: renders user-supplied source code as a styled PNG through a
//! minimal web interface.
//!
//! The crate is split the same way the binary runs: `application` owns the
//! rendering pipeline and error taxonomy, `infra` owns the HTTP surface,
//! embedded assets and telemetry, `presentation` owns the askama views, and
//! `config` resolves layered settings (file, environment, CLI).

pub mod application;
pub mod config;
pub mod infra;
pub mod presentation;
