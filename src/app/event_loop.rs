use std::io::stdout;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use ratatui::DefaultTerminal;
use ratatui::layout::Size;

use crate::app::{App, Message, Model, update};
use crate::document::{DocumentSource, FixtureLoader};
use crate::engine::{PreviewController, WorkerExecutor};
use crate::ui::{cols_to_units, document_content_width, rows_to_units};

/// Poll interval while the render worker has a page in flight.
const RENDER_POLL: Duration = Duration::from_millis(10);
const IDLE_POLL: Duration = Duration::from_millis(250);
/// Quiet period before a terminal resize reflows the pages.
const RESIZE_SETTLE: Duration = Duration::from_millis(100);

/// Holds the latest terminal size until resizing has been quiet for a while.
#[derive(Debug)]
pub(super) struct ResizeDebouncer {
    settle: Duration,
    latest: Option<((u16, u16), Instant)>,
}

impl ResizeDebouncer {
    pub(super) const fn new(settle: Duration) -> Self {
        Self {
            settle,
            latest: None,
        }
    }

    pub(super) fn queue(&mut self, size: (u16, u16), at: Instant) {
        self.latest = Some((size, at));
    }

    /// When the pending size becomes ready, if one is queued.
    pub(super) fn deadline(&self) -> Option<Instant> {
        self.latest.map(|(_, at)| at + self.settle)
    }

    pub(super) fn take_ready(&mut self, now: Instant) -> Option<(u16, u16)> {
        let ready = self.deadline().is_some_and(|at| now >= at);
        if !ready {
            return None;
        }
        self.latest.take().map(|(size, _)| size)
    }

    pub(super) const fn is_pending(&self) -> bool {
        self.latest.is_some()
    }
}

/// Per-run loop state.
struct Session {
    resizes: ResizeDebouncer,
    frame: u64,
    dirty: bool,
}

impl Session {
    fn new() -> Self {
        Self {
            resizes: ResizeDebouncer::new(RESIZE_SETTLE),
            frame: 0,
            dirty: true,
        }
    }

    fn apply(&mut self, model: &mut Model, msg: Message) {
        *model = update(std::mem::take(model), msg);
        self.dirty = true;
    }

    /// How long to wait for input before the next engine tick is due.
    fn poll_timeout(&self, model: &Model) -> Duration {
        if self.dirty {
            return Duration::ZERO;
        }
        let now = Instant::now();
        let wake = [model.preview.next_deadline(), self.resizes.deadline()]
            .into_iter()
            .flatten()
            .min();
        match wake {
            Some(at) => at.saturating_duration_since(now).min(RENDER_POLL),
            None if model.preview.is_busy() => RENDER_POLL,
            None => IDLE_POLL,
        }
    }
}

impl App {
    /// Run the viewer until the user quits.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be initialized, the render
    /// worker cannot be started, the document fails to open, or terminal I/O
    /// fails inside the event loop.
    pub fn run(&mut self) -> Result<()> {
        let _run_scope = crate::perf::scope("app.run.total");

        // The capability query talks to stdio, so it runs before raw mode.
        let picker = if self.options.images {
            let _picker_scope = crate::perf::scope("app.create_picker");
            crate::graphics::create_picker(self.options.force_half_cell)
        } else {
            None
        };

        let init_scope = crate::perf::scope("app.ratatui_init");
        let mut terminal = ratatui::try_init()
            .context("Failed to initialize terminal; pagewise requires an interactive terminal")?;
        let size = terminal.size()?;
        drop(init_scope);

        let result = self
            .build_model(size, picker)
            .and_then(|mut model| Self::event_loop(&mut terminal, &mut model));

        let _ = execute!(stdout(), DisableMouseCapture);
        ratatui::restore();
        result
    }

    fn build_model(
        &self,
        size: Size,
        picker: Option<ratatui_image::picker::Picker>,
    ) -> Result<Model> {
        let executor = WorkerExecutor::spawn().context("Failed to start the render worker")?;
        let preview = PreviewController::new(
            FixtureLoader,
            executor,
            self.options.preview,
            cols_to_units(document_content_width(size.width, false)),
            rows_to_units(size.height.saturating_sub(1)),
        );
        let mut model =
            Model::new(self.file_path.clone(), preview, (size.width, size.height))
                .with_picker(picker);
        model.images_enabled = self.options.images;
        model.config_global_path.clone_from(&self.options.global_config);
        model.config_local_path.clone_from(&self.options.local_config);

        let open_scope = crate::perf::scope("app.open");
        let locator = self.file_path.to_string_lossy().into_owned();
        model
            .open(DocumentSource::Locator(locator))
            .with_context(|| format!("Failed to open {}", self.file_path.display()))?;
        drop(open_scope);

        if self.options.toc_visible && model.preview.outline_available() {
            model = update(model, Message::ToggleToc);
        }
        Ok(model)
    }

    fn event_loop(terminal: &mut DefaultTerminal, model: &mut Model) -> Result<()> {
        let mut session = Session::new();
        execute!(stdout(), EnableMouseCapture)?;

        while !model.should_quit {
            let now = Instant::now();
            session.dirty |= model.expire_toast(now);
            if let Some((width, height)) = session.resizes.take_ready(now) {
                crate::perf::log_event(
                    "event.resize.apply",
                    format!("frame={} size={width}x{height}", session.frame),
                );
                session.apply(model, Message::Resize(width, height));
            }
            model.set_resize_pending(session.resizes.is_pending());
            session.dirty |= model.tick(Instant::now());

            if event::poll(session.poll_timeout(model))? {
                Self::pump_events(model, &mut session)?;
            }
            if session.dirty {
                Self::redraw(terminal, model, &mut session)?;
            }
        }
        Ok(())
    }

    /// Handle every queued input event before the next frame.
    fn pump_events(model: &mut Model, session: &mut Session) -> Result<()> {
        let mut handled = 0_u32;
        loop {
            let event = event::read()?;
            let msg = Self::handle_event(&event, model, Instant::now(), &mut session.resizes);
            if let Some(msg) = msg {
                crate::perf::log_event(
                    "event.message",
                    format!("frame={} {msg:?}", session.frame),
                );
                session.apply(model, msg);
                handled += 1;
            }
            if !event::poll(Duration::ZERO)? {
                break;
            }
        }
        if handled > 1 {
            crate::perf::log_event(
                "event.coalesced",
                format!("frame={} messages={handled}", session.frame),
            );
        }
        Ok(())
    }

    fn redraw(
        terminal: &mut DefaultTerminal,
        model: &mut Model,
        session: &mut Session,
    ) -> Result<()> {
        session.frame += 1;
        let started = Instant::now();
        model.load_visible_pages();
        let prepared = started.elapsed();
        terminal.draw(|frame| Self::view(model, frame))?;
        crate::perf::log_event(
            "frame",
            format!(
                "frame={} prep={prepared:?} draw={:?} scroll_top={:.1} pages={} busy={}",
                session.frame,
                started.elapsed().saturating_sub(prepared),
                model.preview.flow().scroll_top(),
                model.preview.flow().len(),
                model.preview.is_busy()
            ),
        );
        session.dirty = false;
        Ok(())
    }
}
