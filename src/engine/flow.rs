//! The page flow: rendered pages stacked top to bottom inside a scroll container.
//!
//! [`PageFlow`] tracks the container geometry (client size, scroll offset) and
//! the appended [`PageRecord`]s. All extents are layout units, independent of
//! the device scale used for the surfaces.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use image::RgbaImage;
//! use pagewise::engine::flow::PageFlow;
//!
//! let mut flow = PageFlow::new(600.0, 1000.0).with_divider_extent(0.0);
//! let surface = Arc::new(RgbaImage::new(1, 1));
//! flow.append(1, 600.0, 400.0, false, surface.clone(), 1.0).unwrap();
//! flow.append(2, 600.0, 400.0, false, surface, 1.0).unwrap();
//! assert_eq!(flow.content_extent(), 800.0);
//! assert!(!flow.is_filled());
//! ```

use std::ops::Range;
use std::sync::Arc;

use image::RgbaImage;

use super::state::Epoch;
use crate::document::PageNumber;
use crate::error::PageRenderError;

/// Gap drawn between consecutive pages.
pub const DEFAULT_DIVIDER_EXTENT: f32 = 8.0;

/// A rendered page in the flow. Never mutated after it is appended.
#[derive(Debug, Clone)]
pub struct PageRecord {
    number: PageNumber,
    epoch: Epoch,
    top: f32,
    width: f32,
    height: f32,
    divider: f32,
    scale: f32,
    surface: Arc<RgbaImage>,
}

impl PageRecord {
    pub const fn number(&self) -> PageNumber {
        self.number
    }

    pub const fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Offset of the page's top edge from the top of the flow.
    pub const fn top(&self) -> f32 {
        self.top
    }

    pub const fn width(&self) -> f32 {
        self.width
    }

    pub const fn height(&self) -> f32 {
        self.height
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    pub fn has_divider(&self) -> bool {
        self.divider > 0.0
    }

    /// Height plus the divider below it.
    pub fn extent(&self) -> f32 {
        self.height + self.divider
    }

    /// Device scale the surface was rendered at.
    pub const fn scale(&self) -> f32 {
        self.scale
    }

    pub fn surface(&self) -> &RgbaImage {
        &self.surface
    }
}

/// Scroll container holding the rendered pages of the current epoch.
#[derive(Debug, Clone)]
pub struct PageFlow {
    records: Vec<PageRecord>,
    epoch: Epoch,
    client_width: f32,
    client_height: f32,
    scroll_top: f32,
    divider_extent: f32,
}

impl PageFlow {
    /// Create an empty flow for a container of the given client size.
    pub const fn new(client_width: f32, client_height: f32) -> Self {
        Self {
            records: Vec::new(),
            epoch: Epoch::ZERO,
            client_width,
            client_height,
            scroll_top: 0.0,
            divider_extent: DEFAULT_DIVIDER_EXTENT,
        }
    }

    #[must_use]
    pub fn with_divider_extent(mut self, extent: f32) -> Self {
        self.divider_extent = extent;
        self
    }

    pub const fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn pages(&self) -> &[PageRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn page_numbers(&self) -> Vec<PageNumber> {
        self.records.iter().map(PageRecord::number).collect()
    }

    pub fn record(&self, number: PageNumber) -> Option<&PageRecord> {
        self.records.iter().find(|r| r.number == number)
    }

    pub fn last_number(&self) -> Option<PageNumber> {
        self.records.last().map(PageRecord::number)
    }

    pub const fn client_width(&self) -> f32 {
        self.client_width
    }

    pub const fn client_height(&self) -> f32 {
        self.client_height
    }

    pub const fn scroll_top(&self) -> f32 {
        self.scroll_top
    }

    /// Total height of appended pages and their dividers.
    pub fn content_extent(&self) -> f32 {
        self.records.last().map_or(0.0, |r| r.top + r.extent())
    }

    /// Scrollable height; never less than the client height.
    pub fn scroll_extent(&self) -> f32 {
        self.content_extent().max(self.client_height)
    }

    /// True once the content covers the client area.
    pub fn is_filled(&self) -> bool {
        self.content_extent() >= self.client_height
    }

    /// Remaining scroll distance below the visible area.
    pub fn distance_to_bottom(&self) -> f32 {
        (self.scroll_extent() - (self.scroll_top + self.client_height)).max(0.0)
    }

    /// Layout range currently inside the client area.
    pub fn visible_range(&self) -> Range<f32> {
        self.scroll_top..self.scroll_top + self.client_height
    }

    /// Whether the page surface of `record` overlaps the client area.
    pub fn intersects(&self, record: &PageRecord) -> bool {
        let range = self.visible_range();
        record.top < range.end && record.bottom() > range.start
    }

    fn max_scroll_top(&self) -> f32 {
        (self.scroll_extent() - self.client_height).max(0.0)
    }

    pub fn set_scroll_top(&mut self, offset: f32) {
        let offset = if offset.is_finite() { offset } else { 0.0 };
        self.scroll_top = offset.clamp(0.0, self.max_scroll_top());
    }

    pub fn scroll_by(&mut self, delta: f32) {
        self.set_scroll_top(self.scroll_top + delta);
    }

    pub const fn scroll_to_top(&mut self) {
        self.scroll_top = 0.0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_top = self.max_scroll_top();
    }

    /// Scroll position as a percentage (0-100).
    pub fn scroll_percent(&self) -> u8 {
        let max = self.max_scroll_top();
        if max <= 0.0 {
            return 100;
        }
        // Always within 0..=100 after the clamp.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            ((self.scroll_top / max) * 100.0).round().clamp(0.0, 100.0) as u8
        }
    }

    /// Resize the client area, keeping the scroll offset valid.
    pub fn resize(&mut self, client_width: f32, client_height: f32) {
        self.client_width = client_width;
        self.client_height = client_height;
        self.scroll_top = self.scroll_top.min(self.max_scroll_top());
    }

    /// Append a rendered page below the current content.
    ///
    /// # Errors
    ///
    /// Returns [`PageRenderError::OutOfOrder`] when `number` does not exceed the
    /// last appended page number of this epoch.
    pub fn append(
        &mut self,
        number: PageNumber,
        width: f32,
        height: f32,
        divider: bool,
        surface: Arc<RgbaImage>,
        scale: f32,
    ) -> Result<(), PageRenderError> {
        if let Some(last) = self.last_number()
            && number <= last
        {
            return Err(PageRenderError::OutOfOrder { page: number, last });
        }
        let top = self.content_extent();
        self.records.push(PageRecord {
            number,
            epoch: self.epoch,
            top,
            width,
            height,
            divider: if divider { self.divider_extent } else { 0.0 },
            scale,
            surface,
        });
        Ok(())
    }

    /// Drop every page and start a new epoch. The scroll offset returns to the top.
    pub fn clear(&mut self) -> Epoch {
        self.records.clear();
        self.scroll_top = 0.0;
        self.epoch = self.epoch.next();
        self.epoch
    }
}
