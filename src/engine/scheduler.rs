//! Batch scheduling: how many pages a render pass asks for.
//!
//! A [`Batch`] is one render pass. Initial batches fill the viewport, scroll
//! batches add exactly one page, and navigation batches render a fixed window
//! followed by an estimated top-up. Only one batch exists at a time; the
//! controller holds the busy guard for as long as it does.

use std::time::{Duration, Instant};

use super::executor::RenderTicket;
use super::flow::PageFlow;
use super::navigation::estimate_additional_pages;
use super::state::RenderState;

/// Distance from the bottom, in layout units, at which scrolling asks for another page.
pub const DEFAULT_SCROLL_THRESHOLD: f32 = 200.0;

/// Pause between pages of a multi-page batch.
pub const DEFAULT_BATCH_YIELD: Duration = Duration::from_millis(10);

/// Pages rendered unconditionally after a navigation.
pub const DEFAULT_NAVIGATION_WINDOW: u32 = 3;

/// Tuning knobs for the scheduler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerConfig {
    pub scroll_threshold: f32,
    pub batch_yield: Duration,
    pub navigation_window: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            scroll_threshold: DEFAULT_SCROLL_THRESHOLD,
            batch_yield: DEFAULT_BATCH_YIELD,
            navigation_window: DEFAULT_NAVIGATION_WINDOW,
        }
    }
}

/// Which trigger started a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    Initial,
    Scroll,
    Navigation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Budget {
    /// Until the content covers the client area.
    FillViewport,
    /// Exactly one page.
    Single,
    /// A fixed number of pages, then an estimate if the viewport is still short.
    Window { remaining: u32 },
    /// A computed number of pages.
    Estimated { remaining: u32 },
}

/// The active render pass.
#[derive(Debug, Clone)]
pub struct Batch {
    kind: BatchKind,
    budget: Budget,
    rendered: u32,
    in_flight: Option<RenderTicket>,
    resume_at: Option<Instant>,
}

impl Batch {
    pub const fn initial() -> Self {
        Self::with_budget(BatchKind::Initial, Budget::FillViewport)
    }

    pub const fn scroll() -> Self {
        Self::with_budget(BatchKind::Scroll, Budget::Single)
    }

    pub fn navigation(window: u32) -> Self {
        Self::with_budget(
            BatchKind::Navigation,
            Budget::Window {
                remaining: window.max(1),
            },
        )
    }

    const fn with_budget(kind: BatchKind, budget: Budget) -> Self {
        Self {
            kind,
            budget,
            rendered: 0,
            in_flight: None,
            resume_at: None,
        }
    }

    pub const fn kind(&self) -> BatchKind {
        self.kind
    }

    /// Pages inserted by this batch so far.
    pub const fn rendered(&self) -> u32 {
        self.rendered
    }

    pub const fn in_flight(&self) -> Option<RenderTicket> {
        self.in_flight
    }

    pub const fn set_in_flight(&mut self, ticket: RenderTicket) {
        self.in_flight = Some(ticket);
        self.resume_at = None;
    }

    /// Take the in-flight ticket if `ticket` is the one this batch waits for.
    pub fn accept(&mut self, ticket: RenderTicket) -> bool {
        if self.in_flight == Some(ticket) {
            self.in_flight = None;
            true
        } else {
            false
        }
    }

    pub const fn resume_at(&self) -> Option<Instant> {
        self.resume_at
    }

    /// Whether the batch may request its next page at `now`.
    pub fn is_ready(&self, now: Instant) -> bool {
        self.in_flight.is_none() && self.resume_at.is_none_or(|at| now >= at)
    }

    /// Account for a page that was just inserted and decide whether another follows.
    ///
    /// When it does, the next request is held back until `now + config.batch_yield`.
    pub fn advance(
        &mut self,
        flow: &PageFlow,
        state: &RenderState,
        config: &SchedulerConfig,
        now: Instant,
    ) -> bool {
        self.rendered += 1;
        if !state.has_more_pages() {
            return false;
        }
        let more = match &mut self.budget {
            Budget::FillViewport => !flow.is_filled(),
            Budget::Single => false,
            Budget::Window { remaining } => {
                *remaining = remaining.saturating_sub(1);
                if *remaining > 0 {
                    true
                } else if flow.is_filled() {
                    false
                } else {
                    let extra = estimate_additional_pages(
                        flow,
                        self.rendered,
                        state.total - state.cursor,
                    );
                    tracing::debug!(extra, "navigation window short of viewport");
                    self.budget = Budget::Estimated { remaining: extra };
                    extra > 0
                }
            }
            Budget::Estimated { remaining } => {
                *remaining = remaining.saturating_sub(1);
                *remaining > 0
            }
        };
        if more {
            self.resume_at = Some(now + config.batch_yield);
        }
        more
    }
}

/// Whether a scroll position qualifies for a one-page continuation.
///
/// True when no pass is running, pages remain, and the bottom of the client area
/// is within `threshold` of the end of the scrollable content.
pub fn should_continue_on_scroll(flow: &PageFlow, state: &RenderState, threshold: f32) -> bool {
    if state.busy.is_busy() || !state.has_more_pages() {
        return false;
    }
    flow.scroll_top() + flow.client_height() >= flow.scroll_extent() - threshold
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use image::RgbaImage;

    use super::*;
    use crate::engine::state::Epoch;

    fn flow_of(client: f32, pages: u32, height: f32) -> PageFlow {
        let mut flow = PageFlow::new(100.0, client).with_divider_extent(0.0);
        for n in 1..=pages {
            flow.append(n, 100.0, height, false, Arc::new(RgbaImage::new(1, 1)), 1.0)
                .unwrap();
        }
        flow
    }

    fn state(cursor: u32, total: u32) -> RenderState {
        RenderState {
            cursor,
            total,
            ..RenderState::default()
        }
    }

    #[test]
    fn test_initial_batch_stops_when_filled() {
        let config = SchedulerConfig::default();
        let now = Instant::now();
        let mut batch = Batch::initial();
        assert!(batch.advance(&flow_of(1000.0, 1, 400.0), &state(1, 10), &config, now));
        assert!(batch.advance(&flow_of(1000.0, 2, 400.0), &state(2, 10), &config, now));
        assert!(!batch.advance(&flow_of(1000.0, 3, 400.0), &state(3, 10), &config, now));
        assert_eq!(batch.rendered(), 3);
    }

    #[test]
    fn test_initial_batch_stops_at_last_page() {
        let config = SchedulerConfig::default();
        let mut batch = Batch::initial();
        assert!(!batch.advance(
            &flow_of(1000.0, 2, 100.0),
            &state(2, 2),
            &config,
            Instant::now()
        ));
    }

    #[test]
    fn test_scroll_batch_renders_one_page() {
        let config = SchedulerConfig::default();
        let mut batch = Batch::scroll();
        assert!(!batch.advance(
            &flow_of(1000.0, 1, 10.0),
            &state(1, 10),
            &config,
            Instant::now()
        ));
    }

    #[test]
    fn test_navigation_window_then_estimate() {
        let config = SchedulerConfig::default();
        let now = Instant::now();
        let mut batch = Batch::navigation(3);
        // 100-unit pages in a 1000-unit viewport.
        assert!(batch.advance(&flow_of(1000.0, 1, 100.0), &state(1, 20), &config, now));
        assert!(batch.advance(&flow_of(1000.0, 2, 100.0), &state(2, 20), &config, now));
        // Window exhausted at 300 units; 700 more at 100 per page is 7 pages.
        assert!(batch.advance(&flow_of(1000.0, 3, 100.0), &state(3, 20), &config, now));
        let mut more = 0;
        let mut cursor = 3;
        loop {
            cursor += 1;
            more += 1;
            if !batch.advance(
                &flow_of(1000.0, cursor, 100.0),
                &state(cursor, 20),
                &config,
                now,
            ) {
                break;
            }
        }
        assert_eq!(more, 7);
        assert_eq!(batch.rendered(), 10);
    }

    #[test]
    fn test_navigation_window_stops_when_filled() {
        let config = SchedulerConfig::default();
        let now = Instant::now();
        let mut batch = Batch::navigation(3);
        assert!(batch.advance(&flow_of(500.0, 1, 400.0), &state(1, 20), &config, now));
        assert!(batch.advance(&flow_of(500.0, 2, 400.0), &state(2, 20), &config, now));
        assert!(!batch.advance(&flow_of(500.0, 3, 400.0), &state(3, 20), &config, now));
    }

    #[test]
    fn test_yield_delays_next_request() {
        let config = SchedulerConfig::default();
        let now = Instant::now();
        let mut batch = Batch::initial();
        assert!(batch.is_ready(now));
        batch.advance(&flow_of(1000.0, 1, 100.0), &state(1, 10), &config, now);
        assert!(!batch.is_ready(now));
        assert!(batch.is_ready(now + config.batch_yield));
    }

    #[test]
    fn test_accept_matches_in_flight_ticket_only() {
        let mut batch = Batch::scroll();
        let ticket = RenderTicket {
            epoch: Epoch::ZERO,
            page: 4,
        };
        batch.set_in_flight(ticket);
        assert!(!batch.is_ready(Instant::now()));
        let stale = RenderTicket {
            epoch: Epoch::ZERO.next(),
            page: 4,
        };
        assert!(!batch.accept(stale));
        assert!(batch.accept(ticket));
        assert!(batch.in_flight().is_none());
    }

    #[test]
    fn test_scroll_continuation_threshold() {
        let mut flow = flow_of(1000.0, 3, 400.0);
        let st = state(3, 10);
        // 200 units left below the viewport: exactly at the threshold.
        assert!(should_continue_on_scroll(&flow, &st, 200.0));
        assert!(!should_continue_on_scroll(&flow, &st, 100.0));
        flow.scroll_to_bottom();
        assert!(should_continue_on_scroll(&flow, &st, 0.0));
    }

    #[test]
    fn test_scroll_continuation_blocked_when_busy_or_done() {
        let flow = flow_of(1000.0, 3, 400.0);
        let mut busy = state(3, 10);
        assert!(busy.busy.try_acquire());
        assert!(!should_continue_on_scroll(&flow, &busy, 200.0));
        assert!(!should_continue_on_scroll(&flow, &state(10, 10), 200.0));
    }
}
