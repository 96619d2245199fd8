//! Document capability.
//!
//! The engine never decodes a document format itself. It talks to an opened
//! document through [`DocumentHandle`] and rasterizes pages through
//! [`DocumentPage`]; a [`DocumentLoader`] turns bytes or a locator into a handle.
//!
//! [`fixture`] provides a JSON-described backend used by the viewer's demo
//! documents, the replay harness and the tests.

pub mod fixture;

use std::sync::Arc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::error::{LoadError, PageRenderError};

pub use fixture::{FixtureDocument, FixtureLoader, FixtureManifest, FixturePage};

/// 1-based page number.
pub type PageNumber = u32;

/// Reference to a page object inside the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRef {
    pub num: u32,
    #[serde(default)]
    pub generation: u16,
}

impl PageRef {
    pub const fn new(num: u32, generation: u16) -> Self {
        Self { num, generation }
    }
}

/// An explicit location: a page reference plus optional placement hints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplicitLocation {
    pub page: PageRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<f32>,
}

impl ExplicitLocation {
    pub const fn page(page: PageRef) -> Self {
        Self {
            page,
            left: None,
            top: None,
            zoom: None,
        }
    }
}

/// Document-internal location an outline entry points at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// Needs a named-destination lookup before it can be resolved.
    Named(String),
    Explicit(ExplicitLocation),
}

/// Raw outline entry as exposed by the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineItem {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<Destination>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<OutlineItem>,
}

impl OutlineItem {
    pub fn new(title: impl Into<String>, dest: Option<Destination>) -> Self {
        Self {
            title: title.into(),
            dest,
            items: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_children(mut self, items: Vec<Self>) -> Self {
        self.items = items;
        self
    }
}

/// A page's raster rectangle at a given render scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageViewport {
    pub width: f32,
    pub height: f32,
    pub scale: f32,
}

impl PageViewport {
    /// Viewport for a page of `width` x `height` units at `scale`.
    pub fn scaled(width: f32, height: f32, scale: f32) -> Self {
        Self {
            width: width * scale,
            height: height * scale,
            scale,
        }
    }

    /// Whole-pixel surface size covering this viewport.
    pub fn pixel_size(&self) -> (u32, u32) {
        // Viewport sizes are small positive floats; rounding up covers the edge pixels.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let to_px = |v: f32| v.max(1.0).ceil() as u32;
        (to_px(self.width), to_px(self.height))
    }
}

/// Where to read a document from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Bytes(Vec<u8>),
    /// A filesystem path or `file://` URL.
    Locator(String),
}

impl DocumentSource {
    /// Short label used in logs and error reports.
    pub fn describe(&self) -> String {
        match self {
            Self::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
            Self::Locator(locator) => locator.clone(),
        }
    }
}

/// One page of an open document.
pub trait DocumentPage {
    /// The page rectangle at `scale`.
    fn viewport(&self, scale: f32) -> PageViewport;

    /// Rasterize the page into `surface`, which is sized to `viewport`.
    fn render(&self, surface: &mut RgbaImage, viewport: &PageViewport)
    -> Result<(), PageRenderError>;
}

/// An opened document. Read-shared by every render job.
pub trait DocumentHandle: Send + Sync + std::fmt::Debug {
    fn page_count(&self) -> PageNumber;

    /// Fetch page `number` (1-based).
    fn page(&self, number: PageNumber) -> Result<Box<dyn DocumentPage + '_>, PageRenderError>;

    /// Outline entries, or `None` when the document has no outline.
    fn outline(&self) -> Option<Vec<OutlineItem>>;

    fn named_destination(&self, name: &str) -> Option<ExplicitLocation>;

    /// 0-based index of the page behind `page`.
    fn page_index(&self, page: &PageRef) -> Option<u32>;

    fn title(&self) -> Option<String> {
        None
    }
}

/// Parses bytes or a locator into an open document.
pub trait DocumentLoader: std::fmt::Debug {
    fn load(&self, source: DocumentSource) -> Result<Arc<dyn DocumentHandle>, LoadError>;
}
