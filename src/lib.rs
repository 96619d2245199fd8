// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. engine::PreviewConfig)
    clippy::module_name_repetitions
)]

//! # Pagewise
//!
//! Progressive, scroll-driven rendering of paged documents.
//!
//! Pages are rasterized a few at a time: enough to fill the viewport when a
//! document opens, one more whenever the reader nears the bottom, and a small
//! window after a jump to a page or an outline entry. The current-page
//! indicator follows the furthest page on screen.
//!
//! ## Architecture
//!
//! - [`engine`]: the renderer itself, driven by [`engine::PreviewController`]
//! - [`document`]: capability traits a document backend implements, plus a
//!   JSON fixture backend
//! - [`app`] and [`ui`]: a terminal viewer in The Elm Architecture (TEA) style
//! - [`replay`]: scripted headless runs with a JSON trace
//!
//! ## Modules
//!
//! - [`config`]: flag files and engine settings
//! - [`error`]: load, render and navigation errors
//! - [`graphics`]: terminal image protocols for page surfaces
//! - [`perf`]: timing scopes and the render debug log

pub mod app;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod graphics;
pub mod perf;
pub mod replay;
pub mod ui;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::app::{App, Message, Model, ViewerOptions};
    pub use crate::document::{DocumentSource, FixtureLoader};
    pub use crate::engine::{InlineExecutor, PreviewConfig, PreviewController, WorkerExecutor};
}
