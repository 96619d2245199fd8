//! Navigation: validating a target page, resetting the flow and sizing the pass.

use super::flow::PageFlow;
use super::state::{Epoch, RenderState};
use super::visibility::VisibilityTracker;
use crate::document::{Destination, DocumentHandle, PageNumber};
use crate::error::NavigationError;

/// Check that `target` can be navigated to right now.
///
/// # Errors
///
/// [`NavigationError::NoDocument`] when nothing is open,
/// [`NavigationError::OutOfRange`] outside `1..=total` and
/// [`NavigationError::Busy`] while a pass is running.
pub const fn validate_target(
    target: PageNumber,
    state: &RenderState,
) -> Result<(), NavigationError> {
    if state.total == 0 {
        return Err(NavigationError::NoDocument);
    }
    if target == 0 || target > state.total {
        return Err(NavigationError::OutOfRange {
            target,
            total: state.total,
        });
    }
    if state.busy.is_busy() {
        return Err(NavigationError::Busy);
    }
    Ok(())
}

/// Estimate how many more pages are needed to fill the client area.
///
/// Uses the average extent of the `rendered` pages seen so far, and never asks
/// for more than `remaining`.
pub fn estimate_additional_pages(flow: &PageFlow, rendered: u32, remaining: u32) -> u32 {
    let content = flow.content_extent();
    let missing = flow.client_height() - content;
    if rendered == 0 || missing <= 0.0 || content <= 0.0 {
        return 0;
    }
    #[allow(clippy::cast_precision_loss)]
    let average = content / rendered as f32;
    // Bounded by `remaining` right after the cast.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let needed = (missing / average).ceil() as u32;
    needed.min(remaining)
}

/// Resolve an outline destination to a 1-based page number.
///
/// Named destinations are looked up first; explicit ones map their page
/// reference through the document.
pub fn resolve_destination(
    document: &dyn DocumentHandle,
    destination: &Destination,
) -> Option<PageNumber> {
    let location = match destination {
        Destination::Named(name) => document.named_destination(name)?,
        Destination::Explicit(location) => location.clone(),
    };
    document
        .page_index(&location.page)
        .and_then(|index| index.checked_add(1))
}

/// Clear the flow for a pass starting at `target`.
///
/// The tracker is disconnected and replaced, the scroll offset returns to the top
/// and the cursor is parked just before `target`. Returns the new epoch.
pub fn reset_for_navigation(
    flow: &mut PageFlow,
    tracker: &mut VisibilityTracker,
    state: &mut RenderState,
    target: PageNumber,
) -> Epoch {
    tracker.disconnect();
    let epoch = flow.clear();
    *tracker = VisibilityTracker::new(epoch);
    flow.scroll_to_top();
    state.epoch = epoch;
    state.cursor = target.saturating_sub(1);
    epoch
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use image::RgbaImage;

    use super::*;
    use crate::document::{ExplicitLocation, FixtureDocument, FixtureManifest, PageRef};

    fn flow_of(client: f32, pages: u32, height: f32) -> PageFlow {
        let mut flow = PageFlow::new(100.0, client).with_divider_extent(0.0);
        for n in 1..=pages {
            flow.append(n, 100.0, height, false, Arc::new(RgbaImage::new(1, 1)), 1.0)
                .unwrap();
        }
        flow
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let state = RenderState {
            total: 5,
            ..RenderState::default()
        };
        assert_eq!(
            validate_target(0, &state),
            Err(NavigationError::OutOfRange {
                target: 0,
                total: 5
            })
        );
        assert_eq!(
            validate_target(6, &state),
            Err(NavigationError::OutOfRange {
                target: 6,
                total: 5
            })
        );
        assert_eq!(validate_target(5, &state), Ok(()));
    }

    #[test]
    fn test_validate_rejects_without_document_or_while_busy() {
        let mut state = RenderState::default();
        assert_eq!(validate_target(1, &state), Err(NavigationError::NoDocument));
        state.total = 3;
        assert!(state.busy.try_acquire());
        assert_eq!(validate_target(1, &state), Err(NavigationError::Busy));
    }

    #[test]
    fn test_estimate_uses_average_extent() {
        let flow = flow_of(1000.0, 3, 100.0);
        assert_eq!(estimate_additional_pages(&flow, 3, 50), 7);
        assert_eq!(estimate_additional_pages(&flow, 3, 4), 4);
    }

    #[test]
    fn test_estimate_rounds_up() {
        let flow = flow_of(1000.0, 3, 300.0);
        assert_eq!(estimate_additional_pages(&flow, 3, 50), 1);
    }

    #[test]
    fn test_estimate_zero_when_filled_or_empty() {
        assert_eq!(estimate_additional_pages(&flow_of(500.0, 3, 300.0), 3, 50), 0);
        assert_eq!(estimate_additional_pages(&flow_of(500.0, 0, 300.0), 0, 50), 0);
    }

    #[test]
    fn test_resolve_explicit_and_named_destinations() {
        let manifest = FixtureManifest::uniform(5, 10.0, 10.0)
            .with_destination("appendix", ExplicitLocation::page(PageRef::new(4, 0)));
        let doc = FixtureDocument::new(manifest).unwrap();
        let explicit = Destination::Explicit(ExplicitLocation::page(PageRef::new(2, 0)));
        assert_eq!(resolve_destination(&doc, &explicit), Some(2));
        let named = Destination::Named("appendix".to_string());
        assert_eq!(resolve_destination(&doc, &named), Some(4));
        let missing = Destination::Named("nowhere".to_string());
        assert_eq!(resolve_destination(&doc, &missing), None);
        let dangling = Destination::Explicit(ExplicitLocation::page(PageRef::new(99, 0)));
        assert_eq!(resolve_destination(&doc, &dangling), None);
    }

    #[test]
    fn test_reset_clears_flow_and_recreates_tracker() {
        let mut flow = flow_of(1000.0, 4, 300.0);
        flow.set_scroll_top(200.0);
        let mut tracker = VisibilityTracker::new(flow.epoch());
        for n in 1..=4 {
            tracker.observe(n);
        }
        tracker.refresh(&flow);
        let mut state = RenderState {
            cursor: 4,
            total: 10,
            ..RenderState::default()
        };
        let epoch = reset_for_navigation(&mut flow, &mut tracker, &mut state, 7);
        assert!(flow.is_empty());
        assert!((flow.scroll_top() - 0.0).abs() < f32::EPSILON);
        assert_eq!(tracker.epoch(), epoch);
        assert!(tracker.is_connected());
        assert!(tracker.visible().is_empty());
        assert_eq!(tracker.current_page(), None);
        assert_eq!(state.cursor, 6);
        assert_eq!(state.epoch, epoch);
    }
}
