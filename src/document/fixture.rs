//! JSON-described documents.
//!
//! A fixture manifest lists page sizes and colours, an optional outline and
//! named destinations. Pages are rasterized as paper with a frame and rows of
//! "text" bars so that surfaces look like pages when shown in the viewer.
//!
//! ```json
//! {
//!   "title": "Manual",
//!   "pages": [{ "width": 612, "height": 792 }, { "width": 612, "height": 792, "damaged": true }],
//!   "outline": [{ "title": "Intro", "dest": { "named": "intro" } }],
//!   "destinations": { "intro": { "page": { "num": 1 } } }
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use super::{
    DocumentHandle, DocumentLoader, DocumentPage, DocumentSource, ExplicitLocation, OutlineItem,
    PageNumber, PageRef, PageViewport,
};
use crate::error::{LoadError, PageRenderError};

const DEFAULT_PAPER: [u8; 3] = [250, 250, 246];
const DEFAULT_INK: [u8; 3] = [60, 60, 70];
/// Page margin and text row pitch, in page units.
const MARGIN: f32 = 48.0;
const ROW_PITCH: f32 = 14.0;
const ROW_HEIGHT: f32 = 6.0;

/// One page entry in a manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixturePage {
    pub width: f32,
    pub height: f32,
    /// Object reference; defaults to `{num: index + 1}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<PageRef>,
    #[serde(default = "default_paper")]
    pub paper: [u8; 3],
    #[serde(default = "default_ink")]
    pub ink: [u8; 3],
    /// Damaged pages reject rendering.
    #[serde(default)]
    pub damaged: bool,
}

impl FixturePage {
    pub const fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            object: None,
            paper: DEFAULT_PAPER,
            ink: DEFAULT_INK,
            damaged: false,
        }
    }
}

const fn default_paper() -> [u8; 3] {
    DEFAULT_PAPER
}

const fn default_ink() -> [u8; 3] {
    DEFAULT_INK
}

/// Whole-document manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixtureManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub pages: Vec<FixturePage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outline: Vec<OutlineItem>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub destinations: HashMap<String, ExplicitLocation>,
}

impl FixtureManifest {
    /// `count` pages of identical size, no outline.
    pub fn uniform(count: u32, width: f32, height: f32) -> Self {
        Self {
            title: None,
            pages: (0..count).map(|_| FixturePage::new(width, height)).collect(),
            outline: Vec::new(),
            destinations: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_outline(mut self, outline: Vec<OutlineItem>) -> Self {
        self.outline = outline;
        self
    }

    #[must_use]
    pub fn with_destination(mut self, name: impl Into<String>, location: ExplicitLocation) -> Self {
        self.destinations.insert(name.into(), location);
        self
    }

    /// Mark page `number` (1-based) as damaged.
    #[must_use]
    pub fn with_damaged_page(mut self, number: PageNumber) -> Self {
        if let Some(page) = number
            .checked_sub(1)
            .and_then(|idx| self.pages.get_mut(idx as usize))
        {
            page.damaged = true;
        }
        self
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// An opened fixture document.
#[derive(Debug, Clone)]
pub struct FixtureDocument {
    manifest: FixtureManifest,
    refs: Vec<PageRef>,
}

impl FixtureDocument {
    /// Validate `manifest` and open it.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Malformed`] for an empty page list, non-positive page
    /// sizes, or duplicate page object references.
    pub fn new(manifest: FixtureManifest) -> Result<Self, LoadError> {
        if manifest.pages.is_empty() {
            return Err(LoadError::Malformed("document has no pages".to_string()));
        }
        let mut refs = Vec::with_capacity(manifest.pages.len());
        for (idx, page) in manifest.pages.iter().enumerate() {
            let valid = |v: f32| v.is_finite() && v > 0.0;
            if !valid(page.width) || !valid(page.height) {
                return Err(LoadError::Malformed(format!(
                    "page {} has invalid size {}x{}",
                    idx + 1,
                    page.width,
                    page.height
                )));
            }
            let fallback = u32::try_from(idx + 1).unwrap_or(u32::MAX);
            let object = page.object.unwrap_or(PageRef::new(fallback, 0));
            if refs.contains(&object) {
                return Err(LoadError::Malformed(format!(
                    "page {} reuses object {} {}",
                    idx + 1,
                    object.num,
                    object.generation
                )));
            }
            refs.push(object);
        }
        Ok(Self { manifest, refs })
    }

    /// Parse a JSON manifest.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Malformed`] when the bytes are not a valid manifest.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, LoadError> {
        let manifest: FixtureManifest =
            serde_json::from_slice(bytes).map_err(|err| LoadError::Malformed(err.to_string()))?;
        Self::new(manifest)
    }

    pub const fn manifest(&self) -> &FixtureManifest {
        &self.manifest
    }
}

impl DocumentHandle for FixtureDocument {
    fn page_count(&self) -> PageNumber {
        PageNumber::try_from(self.manifest.pages.len()).unwrap_or(PageNumber::MAX)
    }

    fn page(&self, number: PageNumber) -> Result<Box<dyn DocumentPage + '_>, PageRenderError> {
        let page = number
            .checked_sub(1)
            .and_then(|idx| self.manifest.pages.get(idx as usize))
            .ok_or(PageRenderError::OutOfRange {
                page: number,
                total: self.page_count(),
            })?;
        Ok(Box::new(FixturePageView { number, page }))
    }

    fn outline(&self) -> Option<Vec<OutlineItem>> {
        if self.manifest.outline.is_empty() {
            None
        } else {
            Some(self.manifest.outline.clone())
        }
    }

    fn named_destination(&self, name: &str) -> Option<ExplicitLocation> {
        self.manifest.destinations.get(name).cloned()
    }

    fn page_index(&self, page: &PageRef) -> Option<u32> {
        self.refs
            .iter()
            .position(|r| r == page)
            .and_then(|idx| u32::try_from(idx).ok())
    }

    fn title(&self) -> Option<String> {
        self.manifest.title.clone()
    }
}

struct FixturePageView<'a> {
    number: PageNumber,
    page: &'a FixturePage,
}

impl DocumentPage for FixturePageView<'_> {
    fn viewport(&self, scale: f32) -> PageViewport {
        PageViewport::scaled(self.page.width, self.page.height, scale)
    }

    fn render(
        &self,
        surface: &mut RgbaImage,
        viewport: &PageViewport,
    ) -> Result<(), PageRenderError> {
        if self.page.damaged {
            return Err(PageRenderError::Rejected {
                page: self.number,
                reason: "page content stream is damaged".to_string(),
            });
        }
        let [r, g, b] = self.page.paper;
        let paper = Rgba([r, g, b, 255]);
        let [r, g, b] = self.page.ink;
        let ink = Rgba([r, g, b, 255]);

        for px in surface.pixels_mut() {
            *px = paper;
        }

        let (w, h) = surface.dimensions();
        if w == 0 || h == 0 {
            return Ok(());
        }
        // Frame.
        for x in 0..w {
            surface.put_pixel(x, 0, ink);
            surface.put_pixel(x, h - 1, ink);
        }
        for y in 0..h {
            surface.put_pixel(0, y, ink);
            surface.put_pixel(w - 1, y, ink);
        }

        // Text rows; every fifth row is short, like a paragraph end.
        let scale = viewport.scale;
        let to_px = |v: f32| {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let px = (v * scale).max(0.0) as u32;
            px
        };
        let margin = to_px(MARGIN);
        let row_height = to_px(ROW_HEIGHT).max(1);
        let pitch = to_px(ROW_PITCH).max(row_height.saturating_add(1));
        let right = w.saturating_sub(margin);
        let bottom = h.saturating_sub(margin);
        let mut row = 0_u32;
        let mut y = margin;
        while margin < right {
            let Some(row_end) = y.checked_add(row_height).filter(|&end| end <= bottom) else {
                break;
            };
            let end = if row % 5 == 4 {
                margin + (right - margin) / 5 * 3
            } else {
                right
            };
            for yy in y..row_end {
                for x in margin..end {
                    surface.put_pixel(x, yy, ink);
                }
            }
            row = row.wrapping_add(1);
            let Some(next) = y.checked_add(pitch) else {
                break;
            };
            y = next;
        }
        Ok(())
    }
}

/// Loads fixture manifests from bytes, paths or `file://` URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureLoader;

impl FixtureLoader {
    fn read_locator(locator: &str) -> Result<Vec<u8>, LoadError> {
        let path = if let Some(rest) = locator.strip_prefix("file://") {
            rest
        } else if locator.contains("://") {
            return Err(LoadError::UnsupportedLocator(locator.to_string()));
        } else {
            locator
        };
        std::fs::read(Path::new(path)).map_err(|source| LoadError::Read {
            locator: locator.to_string(),
            source,
        })
    }
}

impl DocumentLoader for FixtureLoader {
    fn load(&self, source: DocumentSource) -> Result<Arc<dyn DocumentHandle>, LoadError> {
        let bytes = match source {
            DocumentSource::Bytes(bytes) => bytes,
            DocumentSource::Locator(locator) => Self::read_locator(&locator)?,
        };
        let document = FixtureDocument::from_slice(&bytes)?;
        tracing::debug!(
            pages = document.page_count(),
            outline = !document.manifest.outline.is_empty(),
            "fixture document opened"
        );
        Ok(Arc::new(document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Destination;

    fn render_page(doc: &FixtureDocument, number: PageNumber, scale: f32) -> RgbaImage {
        let page = doc.page(number).unwrap();
        let vp = page.viewport(scale);
        let (w, h) = vp.pixel_size();
        let mut surface = RgbaImage::new(w, h);
        page.render(&mut surface, &vp).unwrap();
        surface
    }

    #[test]
    fn test_empty_manifest_is_malformed() {
        let err = FixtureDocument::new(FixtureManifest::default()).unwrap_err();
        assert!(matches!(err, LoadError::Malformed(_)));
    }

    #[test]
    fn test_invalid_page_size_is_malformed() {
        let err = FixtureDocument::new(FixtureManifest::uniform(2, 100.0, -3.0)).unwrap_err();
        assert!(err.to_string().contains("invalid size"));
    }

    #[test]
    fn test_duplicate_object_refs_are_malformed() {
        let mut manifest = FixtureManifest::uniform(2, 100.0, 100.0);
        manifest.pages[0].object = Some(PageRef::new(2, 0));
        let err = FixtureDocument::new(manifest).unwrap_err();
        assert!(err.to_string().contains("reuses object"));
    }

    #[test]
    fn test_garbage_bytes_are_malformed() {
        let err = FixtureDocument::from_slice(b"%PDF-1.7 not json").unwrap_err();
        assert!(matches!(err, LoadError::Malformed(_)));
    }

    #[test]
    fn test_page_lookup_is_one_based() {
        let doc = FixtureDocument::new(FixtureManifest::uniform(3, 100.0, 200.0)).unwrap();
        assert_eq!(doc.page_count(), 3);
        assert!(doc.page(1).is_ok());
        assert!(doc.page(3).is_ok());
        assert_eq!(
            doc.page(0).err(),
            Some(PageRenderError::OutOfRange { page: 0, total: 3 })
        );
        assert_eq!(
            doc.page(4).err(),
            Some(PageRenderError::OutOfRange { page: 4, total: 3 })
        );
    }

    #[test]
    fn test_render_fills_paper_and_frame() {
        let doc = FixtureDocument::new(FixtureManifest::uniform(1, 200.0, 300.0)).unwrap();
        let surface = render_page(&doc, 1, 2.0);
        assert_eq!(surface.dimensions(), (400, 600));
        let [r, g, b] = DEFAULT_INK;
        assert_eq!(*surface.get_pixel(0, 0), Rgba([r, g, b, 255]));
        let [r, g, b] = DEFAULT_PAPER;
        assert_eq!(*surface.get_pixel(10, 10), Rgba([r, g, b, 255]));
    }

    #[test]
    fn test_render_into_degenerate_surfaces() {
        let doc = FixtureDocument::new(FixtureManifest::uniform(1, 200.0, 300.0)).unwrap();
        let page = doc.page(1).unwrap();
        let vp = page.viewport(1.0);
        for (w, h) in [(0, 0), (0, 40), (40, 0), (1, 1)] {
            let mut surface = RgbaImage::new(w, h);
            assert_eq!(page.render(&mut surface, &vp), Ok(()), "{w}x{h}");
        }
        // A huge scale pushes margins and row geometry past the surface.
        let vp = page.viewport(f32::MAX);
        let mut surface = RgbaImage::new(8, 8);
        assert_eq!(page.render(&mut surface, &vp), Ok(()));
        let [r, g, b] = DEFAULT_INK;
        assert_eq!(*surface.get_pixel(7, 7), Rgba([r, g, b, 255]));
    }

    #[test]
    fn test_damaged_page_rejects_render() {
        let manifest = FixtureManifest::uniform(2, 100.0, 100.0).with_damaged_page(2);
        let doc = FixtureDocument::new(manifest).unwrap();
        let page = doc.page(2).unwrap();
        let vp = page.viewport(1.0);
        let mut surface = RgbaImage::new(100, 100);
        let err = page.render(&mut surface, &vp).unwrap_err();
        assert!(matches!(err, PageRenderError::Rejected { page: 2, .. }));
    }

    #[test]
    fn test_page_index_uses_default_and_explicit_refs() {
        let mut manifest = FixtureManifest::uniform(3, 100.0, 100.0);
        manifest.pages[2].object = Some(PageRef::new(40, 1));
        let doc = FixtureDocument::new(manifest).unwrap();
        assert_eq!(doc.page_index(&PageRef::new(1, 0)), Some(0));
        assert_eq!(doc.page_index(&PageRef::new(2, 0)), Some(1));
        assert_eq!(doc.page_index(&PageRef::new(40, 1)), Some(2));
        assert_eq!(doc.page_index(&PageRef::new(3, 0)), None);
    }

    #[test]
    fn test_outline_absent_when_empty() {
        let doc = FixtureDocument::new(FixtureManifest::uniform(1, 10.0, 10.0)).unwrap();
        assert!(doc.outline().is_none());

        let manifest = FixtureManifest::uniform(1, 10.0, 10.0).with_outline(vec![
            OutlineItem::new("Intro", Some(Destination::Named("intro".to_string()))),
        ]);
        let doc = FixtureDocument::new(manifest).unwrap();
        assert_eq!(doc.outline().map(|o| o.len()), Some(1));
    }

    #[test]
    fn test_loader_reads_bytes_and_paths() {
        let manifest = FixtureManifest::uniform(4, 100.0, 100.0);
        let json = manifest.to_json().unwrap();

        let doc = FixtureLoader
            .load(DocumentSource::Bytes(json.clone().into_bytes()))
            .unwrap();
        assert_eq!(doc.page_count(), 4);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        std::fs::write(&path, json).unwrap();
        let doc = FixtureLoader
            .load(DocumentSource::Locator(path.display().to_string()))
            .unwrap();
        assert_eq!(doc.page_count(), 4);

        let url = format!("file://{}", path.display());
        let doc = FixtureLoader.load(DocumentSource::Locator(url)).unwrap();
        assert_eq!(doc.page_count(), 4);
    }

    #[test]
    fn test_loader_rejects_remote_and_missing_locators() {
        let err = FixtureLoader
            .load(DocumentSource::Locator("https://example.com/a.json".to_string()))
            .unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedLocator(_)));

        let err = FixtureLoader
            .load(DocumentSource::Locator("/definitely/not/here.json".to_string()))
            .unwrap_err();
        assert!(matches!(err, LoadError::Read { .. }));
    }
}
