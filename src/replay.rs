//! Headless replay: drive the engine from a script and trace every step.
//!
//! A script holds one command per line; `#` starts a comment.
//!
//! ```text
//! scroll 400        # scroll by layout units (negative scrolls up)
//! scroll-to 0
//! bottom
//! navigate 7
//! search chapter    # filter the outline; `search` alone clears it
//! outline 1         # select row 1 (0-based) of the filtered outline
//! resize 612 1200
//! ```
//!
//! Each step runs to completion on an [`InlineExecutor`] and produces a
//! [`ReplayStep`], printed as one JSON object per line.

use std::cell::RefCell;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use thiserror::Error;

use crate::document::{DocumentSource, FixtureLoader, PageNumber};
use crate::engine::{
    Epoch, InlineExecutor, NodeId, PreviewCallbacks, PreviewConfig, PreviewController,
    RenderStatus,
};

/// Default replay viewport: a US Letter page wide, a bit over two pages of 400 tall.
pub const DEFAULT_CLIENT_WIDTH: f32 = 612.0;
pub const DEFAULT_CLIENT_HEIGHT: f32 = 1000.0;

/// A script line that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ScriptError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Scroll(f32),
    ScrollTo(f32),
    Bottom,
    Navigate(PageNumber),
    /// Row of the currently filtered outline.
    Outline(usize),
    Search(String),
    Resize(f32, f32),
}

impl Command {
    fn label(&self) -> String {
        match self {
            Self::Scroll(delta) => format!("scroll {delta}"),
            Self::ScrollTo(offset) => format!("scroll-to {offset}"),
            Self::Bottom => "bottom".to_string(),
            Self::Navigate(page) => format!("navigate {page}"),
            Self::Outline(row) => format!("outline {row}"),
            Self::Search(query) if query.is_empty() => "search".to_string(),
            Self::Search(query) => format!("search {query}"),
            Self::Resize(width, height) => format!("resize {width} {height}"),
        }
    }
}

/// Parse a replay script.
///
/// # Errors
///
/// Returns the first line with an unknown command or a bad argument.
pub fn parse_script(text: &str) -> Result<Vec<Command>, ScriptError> {
    let mut commands = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.split_once('#').map_or(raw, |(code, _)| code).trim();
        if line.is_empty() {
            continue;
        }
        let fail = |message: String| ScriptError {
            line: idx + 1,
            message,
        };
        let (name, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(name, rest)| (name, rest.trim()));
        let args: Vec<&str> = rest.split_whitespace().collect();
        let command = match name {
            "scroll" => Command::Scroll(number(&args, 0, name).map_err(fail)?),
            "scroll-to" => Command::ScrollTo(number(&args, 0, name).map_err(fail)?),
            "bottom" => Command::Bottom,
            "navigate" => Command::Navigate(number(&args, 0, name).map_err(fail)?),
            "outline" => Command::Outline(number(&args, 0, name).map_err(fail)?),
            "search" => Command::Search(rest.to_string()),
            "resize" => Command::Resize(
                number(&args, 0, name).map_err(fail)?,
                number(&args, 1, name).map_err(fail)?,
            ),
            other => return Err(fail(format!("unknown command `{other}`"))),
        };
        commands.push(command);
    }
    Ok(commands)
}

fn number<T: std::str::FromStr>(args: &[&str], pos: usize, command: &str) -> Result<T, String> {
    let raw = args
        .get(pos)
        .ok_or_else(|| format!("`{command}` needs argument {}", pos + 1))?;
    raw.parse()
        .map_err(|_| format!("`{command}`: `{raw}` is not a valid number"))
}

/// Engine state after one step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayStep {
    pub step: usize,
    pub command: String,
    pub rendered: Vec<PageNumber>,
    pub visible: Vec<PageNumber>,
    pub current_page: Option<PageNumber>,
    pub total: PageNumber,
    pub busy: bool,
    pub epoch: Epoch,
    pub status: RenderStatus,
    pub scroll_top: f32,
    /// Titles of the outline rows shown for the current search.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outline_visible: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ReplayOptions {
    pub client_width: f32,
    pub client_height: f32,
    pub config: PreviewConfig,
    /// Write every newly rendered page surface here as `page-NNN.png`.
    pub export_dir: Option<PathBuf>,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            client_width: DEFAULT_CLIENT_WIDTH,
            client_height: DEFAULT_CLIENT_HEIGHT,
            config: PreviewConfig::default(),
            export_dir: None,
        }
    }
}

/// A controller driven step by step, collecting reported errors.
#[derive(Debug)]
pub struct Replay {
    preview: PreviewController,
    errors: Rc<RefCell<Vec<String>>>,
    export_dir: Option<PathBuf>,
    exported: HashSet<PageNumber>,
    steps: usize,
}

impl Replay {
    pub fn new(options: &ReplayOptions) -> Self {
        let errors: Rc<RefCell<Vec<String>>> = Rc::default();
        let sink = Rc::clone(&errors);
        let preview = PreviewController::new(
            FixtureLoader,
            InlineExecutor::new(),
            options.config,
            options.client_width,
            options.client_height,
        )
        .with_callbacks(PreviewCallbacks::new().on_error(move |report| {
            let message = report
                .message
                .clone()
                .unwrap_or_else(|| "unknown error".to_string());
            sink.borrow_mut().push(message);
        }));
        Self {
            preview,
            errors,
            export_dir: options.export_dir.clone(),
            exported: HashSet::new(),
            steps: 0,
        }
    }

    pub const fn preview(&self) -> &PreviewController {
        &self.preview
    }

    /// Open the document and run the initial fill. This is step 0.
    ///
    /// # Errors
    ///
    /// Fails when the document cannot be opened or a surface cannot be exported.
    pub fn open(&mut self, source: DocumentSource) -> Result<ReplayStep> {
        let label = format!("open {}", source.describe());
        self.preview
            .open(source, Instant::now())
            .with_context(|| format!("Failed to {label}"))?;
        self.preview.run_until_idle();
        self.snapshot(label)
    }

    /// Apply one command and run the pass it started to completion.
    ///
    /// # Errors
    ///
    /// Fails only when exporting a surface fails; engine rejections are
    /// recorded in [`ReplayStep::errors`].
    pub fn apply(&mut self, command: &Command) -> Result<ReplayStep> {
        let now = Instant::now();
        let rejection = match command {
            Command::Scroll(delta) => {
                self.preview.scroll_by(*delta, now);
                None
            }
            Command::ScrollTo(offset) => {
                self.preview.scroll_to(*offset, now);
                None
            }
            Command::Bottom => {
                self.preview.scroll_to_bottom(now);
                None
            }
            Command::Navigate(page) => self.preview.navigate_to_page(*page, now).err(),
            Command::Outline(row) => self.select_outline_row(*row, now),
            Command::Search(query) => {
                self.preview.set_outline_query(query.as_str());
                None
            }
            Command::Resize(width, height) => {
                self.preview.resize(*width, *height, now);
                None
            }
        };
        // Busy rejections are silent on the callback channel; record them here.
        if let Some(err) = rejection.filter(|e| *e == crate::error::NavigationError::Busy) {
            self.errors.borrow_mut().push(err.to_string());
        }
        self.preview.run_until_idle();
        self.snapshot(command.label())
    }

    fn select_outline_row(
        &mut self,
        row: usize,
        now: Instant,
    ) -> Option<crate::error::NavigationError> {
        let id = self
            .preview
            .outline_visible()
            .and_then(|visible| visible.ids().nth(row))
            .unwrap_or(NodeId(usize::MAX));
        self.preview.select_outline_node(id, now).err()
    }

    fn snapshot(&mut self, command: String) -> Result<ReplayStep> {
        self.export_new_pages()?;
        let outline_visible = self.preview.outline().zip(self.preview.outline_visible()).map(
            |(outline, visible)| {
                visible
                    .ids()
                    .filter_map(|id| outline.node(id))
                    .map(|node| node.title.clone())
                    .collect()
            },
        );
        let step = ReplayStep {
            step: self.steps,
            command,
            rendered: self.preview.rendered_pages(),
            visible: self.preview.visible_pages(),
            current_page: self.preview.current_page(),
            total: self.preview.total_pages(),
            busy: self.preview.is_busy(),
            epoch: self.preview.epoch(),
            status: self.preview.status(),
            scroll_top: self.preview.flow().scroll_top(),
            outline_visible,
            errors: std::mem::take(&mut *self.errors.borrow_mut()),
        };
        self.steps += 1;
        Ok(step)
    }

    fn export_new_pages(&mut self) -> Result<()> {
        let Some(dir) = &self.export_dir else {
            return Ok(());
        };
        for record in self.preview.pages() {
            if !self.exported.insert(record.number()) {
                continue;
            }
            let path = dir.join(format!("page-{:03}.png", record.number()));
            record
                .surface()
                .save(&path)
                .with_context(|| format!("Failed to export {}", path.display()))?;
            tracing::debug!(page = record.number(), path = %path.display(), "surface exported");
        }
        Ok(())
    }
}

/// Open `source`, run `commands` and write one JSON line per step to `out`.
///
/// # Errors
///
/// Fails when the document cannot be opened, a surface cannot be exported, or
/// `out` cannot be written.
pub fn run(
    source: DocumentSource,
    commands: &[Command],
    options: &ReplayOptions,
    mut out: impl Write,
) -> Result<Vec<ReplayStep>> {
    if let Some(dir) = &options.export_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create export dir {}", dir.display()))?;
    }
    let mut replay = Replay::new(options);
    let mut steps = Vec::with_capacity(commands.len() + 1);
    steps.push(replay.open(source)?);
    for command in commands {
        steps.push(replay.apply(command)?);
    }
    for step in &steps {
        serde_json::to_writer(&mut out, step).context("Failed to encode replay step")?;
        writeln!(out).context("Failed to write replay trace")?;
    }
    Ok(steps)
}

/// Read and parse a script file.
///
/// # Errors
///
/// Fails when the file cannot be read or does not parse.
pub fn load_script(path: &Path) -> Result<Vec<Command>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read replay script {}", path.display()))?;
    parse_script(&text).with_context(|| format!("Invalid replay script {}", path.display()))
}
