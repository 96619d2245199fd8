//! Terminal viewer.
//!
//! This module implements The Elm Architecture (TEA):
//! - [`Model`]: viewer state wrapping the [`PreviewController`](crate::engine::PreviewController)
//! - [`Message`]: all possible events and actions
//! - [`update`]: state transitions
//! - [`App::run`]: main event loop with rendering

mod event_loop;
mod input;
mod model;
mod update;

pub use model::{Model, ToastLevel};
pub use update::{Message, update};

use std::path::PathBuf;

use crate::engine::PreviewConfig;

/// Viewer switches resolved from the flag files and the command line.
#[derive(Debug, Clone)]
pub struct ViewerOptions {
    /// Open the outline panel once the document is loaded.
    pub toc_visible: bool,
    /// Draw page images; placeholders otherwise.
    pub images: bool,
    /// Skip terminal graphics detection and draw half-blocks.
    pub force_half_cell: bool,
    pub preview: PreviewConfig,
    /// Flag files listed in the help overlay.
    pub global_config: Option<PathBuf>,
    pub local_config: Option<PathBuf>,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            toc_visible: false,
            images: true,
            force_half_cell: false,
            preview: PreviewConfig::default(),
            global_config: None,
            local_config: None,
        }
    }
}

/// Owns the terminal session for one document.
#[derive(Debug)]
pub struct App {
    file_path: PathBuf,
    options: ViewerOptions,
}

impl App {
    pub const fn new(file_path: PathBuf, options: ViewerOptions) -> Self {
        Self { file_path, options }
    }
}
