//! Load and error notifications.
//!
//! Both callbacks receive the same [`PreviewResult`] envelope, which serializes as
//! `{"success": bool, "data": ..., "message": "..."}`.

use std::fmt;

use serde::Serialize;

use crate::document::PageNumber;
use crate::error::{LoadError, NavigationError, PageRenderError};

/// Uniform result envelope handed to callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewResult<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> PreviewResult<T> {
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn failed(data: Option<T>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data,
            message: Some(message.into()),
        }
    }
}

/// Facts about a freshly opened document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentInfo {
    pub page_count: PageNumber,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub has_outline: bool,
}

/// Stage an error was detected in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Load,
    Render,
    Navigation,
}

/// Payload of an error notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<PageNumber>,
}

impl ErrorReport {
    pub fn from_load(err: &LoadError) -> PreviewResult<Self> {
        Self::envelope(ErrorKind::Load, None, err)
    }

    pub fn from_render(err: &PageRenderError) -> PreviewResult<Self> {
        Self::envelope(ErrorKind::Render, err.page(), err)
    }

    pub fn from_navigation(err: &NavigationError) -> PreviewResult<Self> {
        let page = match err {
            NavigationError::OutOfRange { target, .. } => Some(*target),
            _ => None,
        };
        Self::envelope(ErrorKind::Navigation, page, err)
    }

    fn envelope(
        kind: ErrorKind,
        page: Option<PageNumber>,
        err: &dyn std::error::Error,
    ) -> PreviewResult<Self> {
        PreviewResult::failed(Some(Self { kind, page }), err.to_string())
    }
}

type LoadCallback = Box<dyn FnMut(&PreviewResult<DocumentInfo>)>;
type ErrorCallback = Box<dyn FnMut(&PreviewResult<ErrorReport>)>;

/// Optional notification hooks.
#[derive(Default)]
pub struct PreviewCallbacks {
    on_load: Option<LoadCallback>,
    on_error: Option<ErrorCallback>,
}

impl fmt::Debug for PreviewCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewCallbacks")
            .field("on_load", &self.on_load.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

impl PreviewCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on_load(mut self, f: impl FnMut(&PreviewResult<DocumentInfo>) + 'static) -> Self {
        self.on_load = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_error(mut self, f: impl FnMut(&PreviewResult<ErrorReport>) + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub(crate) fn loaded(&mut self, info: &DocumentInfo) {
        if let Some(f) = self.on_load.as_mut() {
            f(&PreviewResult::ok(info.clone()));
        }
    }

    pub(crate) fn error(&mut self, report: &PreviewResult<ErrorReport>) {
        if let Some(f) = self.on_error.as_mut() {
            f(report);
        }
    }
}
