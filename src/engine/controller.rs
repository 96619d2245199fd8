//! The preview controller: document lifetime, render state and teardown.
//!
//! [`PreviewController`] owns the open document, the page flow, the visibility
//! tracker and the active [`Batch`]. Page rasterization happens on a
//! [`RenderExecutor`]; completions are collected by [`PreviewController::tick`],
//! which the host calls from its event loop.
//!
//! All public operations leave the busy guard released once the pass they
//! started has finished. A request arriving while a pass is running is dropped.

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::events::{DocumentInfo, ErrorReport, PreviewCallbacks};
use super::executor::{RenderCompletion, RenderExecutor, RenderJob, RenderTicket};
use super::flow::{DEFAULT_DIVIDER_EXTENT, PageFlow, PageRecord};
use super::navigation::{reset_for_navigation, validate_target};
use super::outline::{NodeId, OutlineIndex, VisibleNodes};
use super::page_renderer::insert_page;
use super::scheduler::{Batch, SchedulerConfig, should_continue_on_scroll};
use super::state::{Epoch, RenderState, RenderStatus};
use super::surface::{DEFAULT_MAX_SURFACE_PIXELS, DisplayProfile, RasterSurfaces, SurfaceFactory};
use super::visibility::VisibilityTracker;
use crate::document::{DocumentHandle, DocumentLoader, DocumentSource, PageNumber};
use crate::error::{LoadError, NavigationError, PageRenderError};
use crate::perf;

/// How long [`PreviewController::run_until_idle`] waits for one page.
const COMPLETION_TIMEOUT: Duration = Duration::from_secs(30);

/// Engine settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewConfig {
    pub display: DisplayProfile,
    pub scheduler: SchedulerConfig,
    pub max_surface_pixels: u64,
    pub divider_extent: f32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            display: DisplayProfile::default(),
            scheduler: SchedulerConfig::default(),
            max_surface_pixels: DEFAULT_MAX_SURFACE_PIXELS,
            divider_extent: DEFAULT_DIVIDER_EXTENT,
        }
    }
}

/// Top-level orchestrator of the progressive renderer.
#[derive(Debug)]
pub struct PreviewController {
    config: PreviewConfig,
    loader: Box<dyn DocumentLoader>,
    executor: Box<dyn RenderExecutor>,
    surfaces: Arc<dyn SurfaceFactory>,
    callbacks: PreviewCallbacks,
    document: Option<Arc<dyn DocumentHandle>>,
    info: Option<DocumentInfo>,
    state: RenderState,
    flow: PageFlow,
    tracker: VisibilityTracker,
    batch: Option<Batch>,
    outline: Option<OutlineIndex>,
    outline_query: String,
    outline_open: bool,
    /// Scroll and resize events are only handled while a document is mounted.
    listening: bool,
}

impl PreviewController {
    /// Create a controller for a viewport of `client_width` x `client_height` layout units.
    pub fn new(
        loader: impl DocumentLoader + 'static,
        executor: impl RenderExecutor + 'static,
        config: PreviewConfig,
        client_width: f32,
        client_height: f32,
    ) -> Self {
        let flow =
            PageFlow::new(client_width, client_height).with_divider_extent(config.divider_extent);
        let tracker = VisibilityTracker::new(flow.epoch());
        Self {
            config,
            loader: Box::new(loader),
            executor: Box::new(executor),
            surfaces: Arc::new(RasterSurfaces::new(config.max_surface_pixels)),
            callbacks: PreviewCallbacks::default(),
            document: None,
            info: None,
            state: RenderState::default(),
            flow,
            tracker,
            batch: None,
            outline: None,
            outline_query: String::new(),
            outline_open: false,
            listening: false,
        }
    }

    #[must_use]
    pub fn with_callbacks(mut self, callbacks: PreviewCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    #[must_use]
    pub fn with_surfaces(mut self, surfaces: Arc<dyn SurfaceFactory>) -> Self {
        self.surfaces = surfaces;
        self
    }

    /// Open a document and start the initial fill.
    ///
    /// Any document already open is destroyed first. The load callback fires as
    /// soon as the document is open; pages arrive on later ticks.
    ///
    /// # Errors
    ///
    /// Returns the [`LoadError`] when the source cannot be read or parsed; it is
    /// also reported through the error callback and the flow is left empty.
    pub fn open(&mut self, source: DocumentSource, now: Instant) -> Result<DocumentInfo, LoadError> {
        let _scope = perf::scope("engine.open");
        self.destroy();
        self.tracker = VisibilityTracker::new(self.flow.epoch());
        self.state.status = RenderStatus::LoadingDocument;
        let label = source.describe();
        tracing::debug!(source = %label, "opening document");

        let document = match self.loader.load(source).and_then(|doc| {
            if doc.page_count() == 0 {
                Err(LoadError::Malformed("document has no pages".to_string()))
            } else {
                Ok(doc)
            }
        }) {
            Ok(document) => document,
            Err(err) => {
                tracing::warn!(source = %label, error = %err, "document load failed");
                self.state.status = RenderStatus::Idle;
                self.callbacks.error(&ErrorReport::from_load(&err));
                return Err(err);
            }
        };

        let total = document.page_count();
        self.outline = document
            .outline()
            .and_then(|items| OutlineIndex::build(&items));
        let info = DocumentInfo {
            page_count: total,
            title: document.title(),
            has_outline: self.outline.is_some(),
        };
        self.state.total = total;
        self.state.cursor = 0;
        self.document = Some(document);
        self.info = Some(info.clone());
        self.listening = true;
        perf::log_event("engine.open", format!("source={label} pages={total}"));
        self.callbacks.loaded(&info);

        self.start_batch(Batch::initial(), RenderStatus::RenderingInitialBatch, now);
        Ok(info)
    }

    /// Deliver finished renders and issue the next page requests that are due.
    ///
    /// Returns `true` when the flow or the indicator changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut changed = false;
        loop {
            loop {
                match self.executor.try_next() {
                    Ok(Some(completion)) => changed |= self.complete(completion, now),
                    Ok(None) => break,
                    Err(err) => {
                        // Without a worker the in-flight page never completes.
                        if self.batch.as_ref().is_some_and(|b| b.in_flight().is_some()) {
                            self.fail_batch(&err);
                            changed = true;
                        }
                        break;
                    }
                }
            }
            if !self.batch.as_ref().is_some_and(|b| b.is_ready(now)) {
                break;
            }
            self.request_next();
        }
        changed
    }

    /// Drive the active pass to the end, waiting on the executor as needed.
    ///
    /// Cooperative yields between pages are skipped.
    pub fn run_until_idle(&mut self) {
        let mut now = Instant::now();
        while self.batch.is_some() {
            self.tick(now);
            let Some(batch) = &self.batch else {
                break;
            };
            if let Some(at) = batch.resume_at() {
                now = now.max(at);
            } else if batch.in_flight().is_some() {
                match self.executor.wait_next(COMPLETION_TIMEOUT) {
                    Some(completion) => {
                        self.complete(completion, now);
                    }
                    None => self.fail_batch(&PageRenderError::WorkerGone),
                }
            }
        }
    }

    /// Earliest instant at which [`Self::tick`] has work to do, if a pass is running.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.batch.as_ref().and_then(Batch::resume_at)
    }

    /// Handle a scroll event at the current offset.
    ///
    /// Returns `true` when a one-page continuation was started.
    pub fn on_scroll(&mut self, now: Instant) -> bool {
        if !self.listening {
            return false;
        }
        self.tracker.refresh(&self.flow);
        if !should_continue_on_scroll(&self.flow, &self.state, self.config.scheduler.scroll_threshold)
        {
            if self.state.busy.is_busy() {
                tracing::trace!("scroll continuation dropped: pass in progress");
            }
            return false;
        }
        self.start_batch(Batch::scroll(), RenderStatus::Scrolling, now)
    }

    pub fn scroll_by(&mut self, delta: f32, now: Instant) -> bool {
        self.flow.scroll_by(delta);
        self.on_scroll(now)
    }

    pub fn scroll_to(&mut self, offset: f32, now: Instant) -> bool {
        self.flow.set_scroll_top(offset);
        self.on_scroll(now)
    }

    pub fn scroll_to_bottom(&mut self, now: Instant) -> bool {
        self.flow.scroll_to_bottom();
        self.on_scroll(now)
    }

    /// Resize the viewport. Re-checks the scroll continuation at the new size.
    pub fn resize(&mut self, client_width: f32, client_height: f32, now: Instant) -> bool {
        self.flow.resize(client_width, client_height);
        self.on_scroll(now)
    }

    /// Clear the flow and render from page `target`.
    ///
    /// # Errors
    ///
    /// Rejects with [`NavigationError`] before anything is cleared. Every rejection
    /// except [`NavigationError::Busy`] is also reported through the error callback.
    pub fn navigate_to_page(
        &mut self,
        target: PageNumber,
        now: Instant,
    ) -> Result<(), NavigationError> {
        if let Err(err) = validate_target(target, &self.state) {
            self.reject_navigation(&err);
            return Err(err);
        }
        tracing::debug!(target, "navigating");
        self.batch = None;
        let epoch = reset_for_navigation(&mut self.flow, &mut self.tracker, &mut self.state, target);
        perf::log_event("engine.navigate", format!("target={target} epoch={}", epoch.get()));
        self.start_batch(
            Batch::navigation(self.config.scheduler.navigation_window),
            RenderStatus::Navigating,
            now,
        );
        Ok(())
    }

    /// Navigate to the destination of outline node `id` and close the outline panel.
    ///
    /// # Errors
    ///
    /// Fails when no document or outline is available, when the destination does
    /// not resolve, or when the navigation itself is rejected.
    pub fn select_outline_node(
        &mut self,
        id: NodeId,
        now: Instant,
    ) -> Result<PageNumber, NavigationError> {
        let resolved = match (&self.document, &self.outline) {
            (None, _) => Err(NavigationError::NoDocument),
            (Some(_), None) => Err(NavigationError::UnknownOutlineNode(id.0)),
            (Some(document), Some(outline)) => outline.resolve(document.as_ref(), id),
        };
        let page = match resolved {
            Ok(page) => page,
            Err(err) => {
                self.reject_navigation(&err);
                return Err(err);
            }
        };
        self.navigate_to_page(page, now)?;
        self.outline_open = false;
        Ok(page)
    }

    fn reject_navigation(&mut self, err: &NavigationError) {
        if *err == NavigationError::Busy {
            tracing::trace!("navigation dropped: pass in progress");
        } else {
            tracing::warn!(error = %err, "navigation rejected");
            self.callbacks.error(&ErrorReport::from_navigation(err));
        }
    }

    /// Tear everything down. Idempotent; safe when nothing was ever opened.
    pub fn destroy(&mut self) {
        self.listening = false;
        self.tracker.disconnect();
        self.batch = None;
        let epoch = self.flow.clear();
        self.state.reset();
        self.state.epoch = epoch;
        // Late completions carry the old epoch and are discarded anyway.
        while let Ok(Some(_)) = self.executor.try_next() {}
        if self.document.take().is_some() {
            tracing::debug!("document released");
        }
        self.info = None;
        self.outline = None;
        self.outline_query.clear();
        self.outline_open = false;
    }

    fn start_batch(&mut self, batch: Batch, status: RenderStatus, now: Instant) -> bool {
        if !self.state.busy.try_acquire() {
            tracing::trace!(?status, "render request dropped: pass in progress");
            return false;
        }
        tracing::debug!(?status, kind = ?batch.kind(), cursor = self.state.cursor, "batch started");
        self.state.status = status;
        self.batch = Some(batch);
        self.tick(now);
        true
    }

    fn request_next(&mut self) {
        let (Some(document), Some(page)) = (self.document.clone(), self.state.next_page()) else {
            self.finish_batch();
            return;
        };
        let ticket = RenderTicket {
            epoch: self.state.epoch,
            page,
        };
        let job = RenderJob {
            ticket,
            scale: self.config.display.device_scale(),
            document,
            surfaces: Arc::clone(&self.surfaces),
        };
        match self.executor.submit(job) {
            Ok(()) => {
                if let Some(batch) = self.batch.as_mut() {
                    batch.set_in_flight(ticket);
                }
            }
            Err(err) => self.fail_batch(&err),
        }
    }

    /// Apply one completion. Returns `true` when a page was inserted.
    fn complete(&mut self, completion: RenderCompletion, now: Instant) -> bool {
        let RenderCompletion { ticket, result } = completion;
        let accepted = ticket.epoch == self.state.epoch
            && self.batch.as_mut().is_some_and(|b| b.accept(ticket));
        if !accepted {
            tracing::debug!(
                page = ticket.page,
                epoch = ticket.epoch.get(),
                current = self.state.epoch.get(),
                "stale render completion discarded"
            );
            return false;
        }
        // A failed page is consumed too, so the next pass starts after it.
        self.state.cursor = ticket.page;
        let inserted = result.and_then(|rendered| {
            insert_page(&mut self.flow, &mut self.tracker, rendered, self.state.total)
        });
        if let Err(err) = inserted {
            self.fail_batch(&err);
            return false;
        }
        perf::log_event("engine.page", format!("page={} epoch={}", ticket.page, ticket.epoch.get()));
        let more = self
            .batch
            .as_mut()
            .is_some_and(|b| b.advance(&self.flow, &self.state, &self.config.scheduler, now));
        if !more {
            self.finish_batch();
        }
        true
    }

    fn fail_batch(&mut self, err: &PageRenderError) {
        tracing::warn!(error = %err, "page render failed; batch aborted");
        self.callbacks.error(&ErrorReport::from_render(err));
        self.finish_batch();
    }

    fn finish_batch(&mut self) {
        if let Some(batch) = self.batch.take() {
            tracing::debug!(kind = ?batch.kind(), rendered = batch.rendered(), "batch finished");
        }
        self.state.busy.release();
        self.state.status = RenderStatus::Idle;
    }

    pub const fn config(&self) -> &PreviewConfig {
        &self.config
    }

    pub const fn status(&self) -> RenderStatus {
        self.state.status
    }

    pub const fn is_busy(&self) -> bool {
        self.state.busy.is_busy()
    }

    pub const fn is_open(&self) -> bool {
        self.document.is_some()
    }

    pub const fn info(&self) -> Option<&DocumentInfo> {
        self.info.as_ref()
    }

    pub const fn epoch(&self) -> Epoch {
        self.state.epoch
    }

    pub const fn total_pages(&self) -> PageNumber {
        self.state.total
    }

    /// Last page number consumed by a pass.
    pub const fn cursor(&self) -> PageNumber {
        self.state.cursor
    }

    pub const fn has_more_pages(&self) -> bool {
        self.state.has_more_pages()
    }

    pub const fn flow(&self) -> &PageFlow {
        &self.flow
    }

    pub fn pages(&self) -> &[PageRecord] {
        self.flow.pages()
    }

    pub fn rendered_pages(&self) -> Vec<PageNumber> {
        self.flow.page_numbers()
    }

    pub fn visible_pages(&self) -> Vec<PageNumber> {
        self.tracker.visible_pages()
    }

    pub const fn current_page(&self) -> Option<PageNumber> {
        self.tracker.current_page()
    }

    /// `(current, total)` for the page indicator.
    pub const fn page_indicator(&self) -> Option<(PageNumber, PageNumber)> {
        match self.tracker.current_page() {
            Some(current) if self.state.total > 0 => Some((current, self.state.total)),
            _ => None,
        }
    }

    pub const fn outline(&self) -> Option<&OutlineIndex> {
        self.outline.as_ref()
    }

    /// Whether the outline affordance should be shown at all.
    pub const fn outline_available(&self) -> bool {
        self.outline.is_some()
    }

    pub const fn outline_open(&self) -> bool {
        self.outline_open
    }

    /// Show or hide the outline panel. Stays hidden without an outline.
    pub fn toggle_outline(&mut self) -> bool {
        self.outline_open = self.outline.is_some() && !self.outline_open;
        self.outline_open
    }

    pub fn set_outline_open(&mut self, open: bool) {
        self.outline_open = open && self.outline.is_some();
    }

    pub fn outline_query(&self) -> &str {
        &self.outline_query
    }

    pub fn set_outline_query(&mut self, query: impl Into<String>) {
        self.outline_query = query.into();
    }

    /// Outline nodes shown for the current query.
    pub fn outline_visible(&self) -> Option<VisibleNodes> {
        self.outline
            .as_ref()
            .map(|outline| outline.filter(&self.outline_query))
    }
}
