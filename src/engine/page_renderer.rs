//! Single-page rendering.
//!
//! [`render_page`] is the half that may run off the controller thread: it fetches
//! the page, creates a surface sized to the page viewport at the device scale and
//! rasterizes into it. [`insert_page`] is the half that touches controller-owned
//! state: it appends the result to the page flow and registers it with the
//! visibility tracker.

use std::sync::Arc;

use image::RgbaImage;

use super::flow::PageFlow;
use super::surface::SurfaceFactory;
use super::visibility::VisibilityTracker;
use crate::document::{DocumentHandle, PageNumber, PageViewport};
use crate::error::PageRenderError;

/// A rasterized page waiting to be inserted into the flow.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub number: PageNumber,
    /// Page rectangle in layout units (scale 1).
    pub layout: PageViewport,
    /// Page rectangle at the device scale; matches the surface size.
    pub viewport: PageViewport,
    pub surface: RgbaImage,
}

/// Render page `number` of `document` at `scale`.
///
/// # Errors
///
/// Returns [`PageRenderError::OutOfRange`] for numbers outside the document,
/// [`PageRenderError::SurfaceUnavailable`] when no surface can be created and
/// whatever the document reports when rasterization is rejected.
pub fn render_page(
    document: &dyn DocumentHandle,
    surfaces: &dyn SurfaceFactory,
    number: PageNumber,
    scale: f32,
) -> Result<RenderedPage, PageRenderError> {
    let total = document.page_count();
    if number == 0 || number > total {
        return Err(PageRenderError::OutOfRange {
            page: number,
            total,
        });
    }
    let page = document.page(number)?;
    let layout = page.viewport(1.0);
    let viewport = page.viewport(scale);
    let (width, height) = viewport.pixel_size();
    let mut surface = surfaces.create(number, width, height)?;
    page.render(&mut surface, &viewport)?;
    tracing::trace!(page = number, width, height, scale, "page rasterized");
    Ok(RenderedPage {
        number,
        layout,
        viewport,
        surface,
    })
}

/// Append `rendered` to `flow` and start observing it.
///
/// Every page except the last one of the document gets a divider below it.
///
/// # Errors
///
/// Returns [`PageRenderError::OutOfOrder`] when the page does not follow the last
/// appended page; the flow and tracker are left untouched.
pub fn insert_page(
    flow: &mut PageFlow,
    tracker: &mut VisibilityTracker,
    rendered: RenderedPage,
    total: PageNumber,
) -> Result<(), PageRenderError> {
    let RenderedPage {
        number,
        layout,
        viewport,
        surface,
    } = rendered;
    flow.append(
        number,
        layout.width,
        layout.height,
        number < total,
        Arc::new(surface),
        viewport.scale,
    )?;
    tracker.observe(number);
    tracker.refresh(flow);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{FixtureDocument, FixtureManifest};
    use crate::engine::surface::RasterSurfaces;

    fn document(pages: u32) -> FixtureDocument {
        FixtureDocument::new(FixtureManifest::uniform(pages, 60.0, 80.0)).unwrap()
    }

    #[test]
    fn test_surface_is_sized_to_device_scale() {
        let doc = document(2);
        let rendered = render_page(&doc, &RasterSurfaces::default(), 1, 2.0).unwrap();
        assert_eq!(rendered.surface.dimensions(), (120, 160));
        assert!((rendered.layout.height - 80.0).abs() < f32::EPSILON);
        assert!((rendered.viewport.scale - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_out_of_range_page_fails() {
        let doc = document(2);
        let surfaces = RasterSurfaces::default();
        assert_eq!(
            render_page(&doc, &surfaces, 0, 1.0).unwrap_err(),
            PageRenderError::OutOfRange { page: 0, total: 2 }
        );
        assert_eq!(
            render_page(&doc, &surfaces, 3, 1.0).unwrap_err(),
            PageRenderError::OutOfRange { page: 3, total: 2 }
        );
    }

    #[test]
    fn test_surface_over_budget_fails() {
        let doc = document(1);
        let err = render_page(&doc, &RasterSurfaces::new(100), 1, 1.0).unwrap_err();
        assert!(matches!(
            err,
            PageRenderError::SurfaceUnavailable { page: 1, .. }
        ));
    }

    #[test]
    fn test_damaged_page_is_rejected() {
        let manifest = FixtureManifest::uniform(3, 60.0, 80.0).with_damaged_page(2);
        let doc = FixtureDocument::new(manifest).unwrap();
        let err = render_page(&doc, &RasterSurfaces::default(), 2, 1.0).unwrap_err();
        assert!(matches!(err, PageRenderError::Rejected { page: 2, .. }));
    }

    #[test]
    fn test_insert_adds_divider_except_last_page() {
        let doc = document(2);
        let surfaces = RasterSurfaces::default();
        let mut flow = PageFlow::new(60.0, 1000.0);
        let mut tracker = VisibilityTracker::new(flow.epoch());
        for n in 1..=2 {
            let rendered = render_page(&doc, &surfaces, n, 1.0).unwrap();
            insert_page(&mut flow, &mut tracker, rendered, 2).unwrap();
        }
        assert!(flow.record(1).unwrap().has_divider());
        assert!(!flow.record(2).unwrap().has_divider());
        assert_eq!(tracker.visible_pages(), vec![1, 2]);
        assert_eq!(tracker.current_page(), Some(2));
    }

    #[test]
    fn test_insert_out_of_order_leaves_state_intact() {
        let doc = document(3);
        let surfaces = RasterSurfaces::default();
        let mut flow = PageFlow::new(60.0, 1000.0);
        let mut tracker = VisibilityTracker::new(flow.epoch());
        let second = render_page(&doc, &surfaces, 2, 1.0).unwrap();
        insert_page(&mut flow, &mut tracker, second, 3).unwrap();
        let first = render_page(&doc, &surfaces, 1, 1.0).unwrap();
        let err = insert_page(&mut flow, &mut tracker, first, 3).unwrap_err();
        assert_eq!(err, PageRenderError::OutOfOrder { page: 1, last: 2 });
        assert_eq!(flow.page_numbers(), vec![2]);
        assert!(!tracker.is_observing(1));
    }
}
