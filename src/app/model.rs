use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

use ratatui_image::picker::{Picker, ProtocolType};
use ratatui_image::protocol::StatefulProtocol;

use crate::document::{DocumentSource, FixtureLoader, PageNumber};
use crate::engine::{
    DocumentInfo, Epoch, ErrorReport, InlineExecutor, NodeId, PreviewCallbacks, PreviewConfig,
    PreviewController, PreviewResult,
};
use crate::error::LoadError;
use crate::ui::{cols_to_units, document_content_width, page_cells, rows_to_units};

/// Error notifications queued by the controller, drained into toasts.
type Notices = Rc<RefCell<VecDeque<PreviewResult<ErrorReport>>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
struct Toast {
    level: ToastLevel,
    message: String,
    expires_at: Instant,
}

/// The complete viewer state.
///
/// Everything the view draws is derived from here; the render engine itself
/// lives in [`Model::preview`].
pub struct Model {
    pub file_path: PathBuf,
    pub preview: PreviewController,
    notices: Notices,
    terminal_size: (u16, u16),
    /// Selected row of the outline panel (index into [`Model::toc_rows`]).
    pub toc_selected: Option<usize>,
    pub toc_scroll_offset: usize,
    pub toc_focused: bool,
    /// Outline search input; `Some` while the search bar is open.
    pub search_query: Option<String>,
    /// Go-to-page prompt input; `Some` while the prompt is open.
    pub goto_input: Option<String>,
    pub help_visible: bool,
    pub help_scroll_offset: usize,
    pub config_global_path: Option<PathBuf>,
    pub config_local_path: Option<PathBuf>,
    toast: Option<Toast>,
    pub should_quit: bool,
    pub images_enabled: bool,
    pub picker: Option<Picker>,
    /// Terminal image per page: protocol, width in columns, height in rows.
    pub page_protocols: HashMap<PageNumber, (StatefulProtocol, u16, u16)>,
    protocol_epoch: Epoch,
    protocol_cols: u16,
    resize_pending: bool,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("file_path", &self.file_path)
            .field("terminal_size", &self.terminal_size)
            .field("toc_focused", &self.toc_focused)
            .field("preview", &self.preview)
            .finish_non_exhaustive()
    }
}

impl Model {
    /// Wrap `preview` for a terminal of `terminal_size` cells.
    ///
    /// The controller's callbacks are replaced: errors become toasts.
    pub fn new(file_path: PathBuf, preview: PreviewController, terminal_size: (u16, u16)) -> Self {
        let notices = Notices::default();
        let sink = Rc::clone(&notices);
        let preview = preview.with_callbacks(
            PreviewCallbacks::new()
                .on_error(move |report| sink.borrow_mut().push_back(report.clone())),
        );
        let mut model = Self {
            file_path,
            preview,
            notices,
            terminal_size,
            toc_selected: None,
            toc_scroll_offset: 0,
            toc_focused: false,
            search_query: None,
            goto_input: None,
            help_visible: false,
            help_scroll_offset: 0,
            config_global_path: None,
            config_local_path: None,
            toast: None,
            should_quit: false,
            images_enabled: true,
            picker: None,
            page_protocols: HashMap::new(),
            protocol_epoch: Epoch::ZERO,
            protocol_cols: 0,
            resize_pending: false,
        };
        model.reflow_layout();
        model
    }

    #[must_use]
    pub fn with_picker(mut self, picker: Option<Picker>) -> Self {
        self.picker = picker;
        self
    }

    /// Open `source` and start the initial fill.
    ///
    /// # Errors
    ///
    /// Returns the [`LoadError`]; it is also queued as an error toast.
    pub fn open(&mut self, source: DocumentSource) -> Result<DocumentInfo, LoadError> {
        self.page_protocols.clear();
        self.toc_selected = None;
        self.toc_scroll_offset = 0;
        self.search_query = None;
        let result = self.preview.open(source, Instant::now());
        self.collect_notices();
        let info = result?;
        let title = info.title.clone().unwrap_or_else(|| self.file_name());
        self.show_toast(
            ToastLevel::Info,
            format!("{title}: {} pages", info.page_count),
        );
        Ok(info)
    }

    /// Collect finished renders. Returns `true` when something visible changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let changed = self.preview.tick(now);
        self.collect_notices() || changed
    }

    /// Turn queued error notifications into toasts. Returns `true` if any arrived.
    pub(super) fn collect_notices(&mut self) -> bool {
        let latest = {
            let mut queue = self.notices.borrow_mut();
            let latest = queue.back().cloned();
            queue.clear();
            latest
        };
        let Some(report) = latest else {
            return false;
        };
        let message = report
            .message
            .unwrap_or_else(|| "render error".to_string());
        self.show_toast(ToastLevel::Error, message);
        true
    }

    pub fn file_name(&self) -> String {
        self.file_path.file_name().map_or_else(
            || "untitled".to_string(),
            |s| s.to_string_lossy().to_string(),
        )
    }

    pub const fn terminal_size(&self) -> (u16, u16) {
        self.terminal_size
    }

    pub(super) const fn set_terminal_size(&mut self, width: u16, height: u16) {
        self.terminal_size = (width, height);
    }

    /// Whether the outline panel is shown.
    pub const fn toc_visible(&self) -> bool {
        self.preview.outline_open()
    }

    /// Columns available to pages.
    pub fn document_columns(&self) -> u16 {
        document_content_width(self.terminal_size.0, self.toc_visible())
    }

    /// Rows available to pages (the status bar takes one).
    pub const fn document_rows(&self) -> u16 {
        self.terminal_size.1.saturating_sub(1)
    }

    /// Push the current terminal geometry into the engine.
    pub(super) fn reflow_layout(&mut self) {
        let width = cols_to_units(self.document_columns());
        let height = rows_to_units(self.document_rows());
        crate::perf::log_event(
            "layout.reflow",
            format!(
                "terminal={}x{} client={width}x{height} toc={}",
                self.terminal_size.0,
                self.terminal_size.1,
                self.toc_visible()
            ),
        );
        self.preview.resize(width, height, Instant::now());
        self.collect_notices();
    }

    /// Outline rows shown for the current search, in tree order.
    pub fn toc_rows(&self) -> Vec<NodeId> {
        self.preview
            .outline_visible()
            .map(|visible| visible.ids().collect())
            .unwrap_or_default()
    }

    pub fn toc_entry_count(&self) -> usize {
        self.preview.outline_visible().map_or(0, |v| v.len())
    }

    /// Outline rows that fit inside the panel border. The panel spans the full height.
    pub(super) const fn toc_visible_rows(&self) -> usize {
        self.terminal_size.1.saturating_sub(2) as usize
    }

    pub(super) fn max_toc_scroll_offset(&self) -> usize {
        self.toc_entry_count()
            .saturating_sub(self.toc_visible_rows().max(1))
    }

    /// Keep the outline selection on an existing row.
    pub(super) fn clamp_toc_selection(&mut self) {
        let count = self.toc_entry_count();
        self.toc_selected = if count == 0 {
            None
        } else {
            Some(self.toc_selected.unwrap_or(0).min(count - 1))
        };
        self.toc_scroll_offset = self.toc_scroll_offset.min(self.max_toc_scroll_offset());
    }

    /// Build terminal images for pages near the viewport.
    ///
    /// Images belong to one flow generation: navigation or a width change
    /// drops them all.
    pub fn load_visible_pages(&mut self) {
        if self.resize_pending {
            crate::perf::log_event("graphics.load_pages.skip", "resize_pending=true");
            return;
        }
        if !self.images_enabled {
            return;
        }
        let doc_cols = self.document_columns();
        let Some(picker) = &self.picker else { return };

        if self.preview.epoch() != self.protocol_epoch || doc_cols != self.protocol_cols {
            self.page_protocols.clear();
            self.protocol_epoch = self.preview.epoch();
            self.protocol_cols = doc_cols;
        }

        let use_halfblocks = matches!(picker.protocol_type(), ProtocolType::Halfblocks);
        let font_size = picker.font_size();
        let flow = self.preview.flow();
        let visible = flow.visible_range();
        let lookahead = flow.client_height();
        let (start, end) = (visible.start - lookahead, visible.end + lookahead);

        for record in flow.pages() {
            if record.bottom() <= start || record.top() >= end {
                continue;
            }
            if self.page_protocols.contains_key(&record.number()) {
                continue;
            }
            let (cols, rows) = page_cells(record.width(), record.height(), doc_cols);
            let image =
                crate::graphics::page_image(record.surface(), cols, rows, font_size, use_halfblocks);
            let protocol = picker.new_resize_protocol(image);
            let (width_cols, height_rows) = protocol_render_size(&protocol, cols);
            crate::perf::log_event(
                "graphics.load_pages.protocol",
                format!(
                    "page={} cells={cols}x{rows} rendered={width_cols}x{height_rows} halfblocks={use_halfblocks}",
                    record.number()
                ),
            );
            self.page_protocols
                .insert(record.number(), (protocol, width_cols, height_rows.min(rows)));
        }
    }

    pub(super) const fn set_resize_pending(&mut self, pending: bool) {
        self.resize_pending = pending;
    }

    pub(super) fn show_toast(&mut self, level: ToastLevel, message: impl Into<String>) {
        self.toast = Some(Toast {
            level,
            message: message.into(),
            expires_at: Instant::now() + Duration::from_secs(4),
        });
    }

    pub(super) fn expire_toast(&mut self, now: Instant) -> bool {
        if self
            .toast
            .as_ref()
            .is_some_and(|toast| toast.expires_at <= now)
        {
            self.toast = None;
            return true;
        }
        false
    }

    pub fn active_toast(&self) -> Option<(&str, ToastLevel)> {
        self.toast
            .as_ref()
            .map(|toast| (toast.message.as_str(), toast.level))
    }
}

fn protocol_render_size(protocol: &StatefulProtocol, target_width_cols: u16) -> (u16, u16) {
    use ratatui::layout::Rect;
    use ratatui_image::Resize;
    let resize = if matches!(
        protocol.protocol_type(),
        ratatui_image::protocol::StatefulProtocolType::Halfblocks(_)
    ) {
        Resize::Scale(Some(image::imageops::FilterType::CatmullRom))
    } else {
        Resize::Scale(None)
    };
    let area = Rect::new(0, 0, target_width_cols, u16::MAX);
    let rect = protocol.size_for(resize, area);
    (rect.width.max(1), rect.height.max(1))
}

// `update` moves the model through `std::mem::take`.
impl Default for Model {
    fn default() -> Self {
        let preview = PreviewController::new(
            FixtureLoader,
            InlineExecutor::new(),
            PreviewConfig::default(),
            cols_to_units(80),
            rows_to_units(23),
        );
        Self::new(PathBuf::new(), preview, (80, 24))
    }
}
