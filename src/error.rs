//! Error types surfaced by the preview engine.
//!
//! Every failure the engine detects is returned as one of these values or
//! reported through the preview callbacks; none of them escape as panics.

use std::io;

use thiserror::Error;

use crate::document::PageNumber;

/// Failure to open a document. Fatal for that open attempt.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {locator}: {source}")]
    Read {
        locator: String,
        #[source]
        source: io::Error,
    },
    #[error("unsupported document locator: {0}")]
    UnsupportedLocator(String),
    #[error("malformed document: {0}")]
    Malformed(String),
}

/// Failure to render a single page. Aborts the current batch only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageRenderError {
    #[error("page {page} is outside 1..={total}")]
    OutOfRange { page: PageNumber, total: PageNumber },
    #[error("no drawing surface for page {page}: {width}x{height} exceeds the backing-store limit")]
    SurfaceUnavailable {
        page: PageNumber,
        width: u32,
        height: u32,
    },
    #[error("page {page} render rejected: {reason}")]
    Rejected { page: PageNumber, reason: String },
    #[error("page {page} arrived after page {last} in the same pass")]
    OutOfOrder { page: PageNumber, last: PageNumber },
    #[error("render worker is gone")]
    WorkerGone,
}

impl PageRenderError {
    /// Page the failure belongs to, when known.
    pub const fn page(&self) -> Option<PageNumber> {
        match self {
            Self::OutOfRange { page, .. }
            | Self::SurfaceUnavailable { page, .. }
            | Self::Rejected { page, .. }
            | Self::OutOfOrder { page, .. } => Some(*page),
            Self::WorkerGone => None,
        }
    }
}

/// A rejected navigation request. Nothing is cleared when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("no document is open")]
    NoDocument,
    #[error("page {target} is outside 1..={total}")]
    OutOfRange { target: PageNumber, total: PageNumber },
    #[error("a render pass is already in progress")]
    Busy,
    #[error("destination of \"{0}\" could not be resolved")]
    UnresolvedDestination(String),
    #[error("outline entry {0} does not exist")]
    UnknownOutlineNode(usize),
}

/// Umbrella error for callers that do not care which stage failed.
#[derive(Debug, Error)]
pub enum PreviewError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Render(#[from] PageRenderError),
    #[error(transparent)]
    Navigation(#[from] NavigationError),
}
