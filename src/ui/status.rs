use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::app::{Model, ToastLevel};
use crate::engine::RenderStatus;

pub fn render_search_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let query = model.search_query.as_deref().unwrap_or_default();
    let total = model.preview.outline().map_or(0, |o| o.len());
    let match_info = if query.trim().is_empty() {
        String::new()
    } else {
        format!("  [{}/{}]", model.toc_entry_count(), total)
    };
    let text = format!("/{query}{match_info}  Enter: open  Esc: clear");
    frame.render_widget(Paragraph::new(text).style(super::style::input_bar()), area);
}

pub fn render_goto_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let input = model.goto_input.as_deref().unwrap_or_default();
    let text = format!(
        ":{input}  Enter: go to page (1-{})  Esc: cancel",
        model.preview.total_pages()
    );
    frame.render_widget(Paragraph::new(text).style(super::style::input_bar()), area);
}

/// The text of the status bar.
pub fn status_text(model: &Model) -> String {
    let page_info = model
        .preview
        .page_indicator()
        .map_or_else(|| "Page -".to_string(), |(current, total)| format!("Page {current}/{total}"));
    let percent = model.preview.flow().scroll_percent();
    let activity = match model.preview.status() {
        RenderStatus::Idle => "",
        RenderStatus::LoadingDocument => " [opening]",
        RenderStatus::RenderingInitialBatch | RenderStatus::Scrolling => " [rendering]",
        RenderStatus::Navigating => " [navigating]",
    };
    let toc_indicator = if model.toc_visible() { " [outline]" } else { "" };
    format!(
        " {}  {}  [{}%]{}{}  ?:help",
        model.file_name(),
        page_info,
        percent,
        activity,
        toc_indicator
    )
}

pub fn render_status_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let status_bar = Paragraph::new(status_text(model)).style(super::style::status_bar());
    frame.render_widget(status_bar, area);
}

pub fn render_toast_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let Some((message, level)) = model.active_toast() else {
        return;
    };
    let (prefix, style) = match level {
        ToastLevel::Info => ("[info]", Style::default().bg(Color::DarkGray).fg(Color::White)),
        ToastLevel::Warning => ("[warn]", Style::default().bg(Color::Yellow).fg(Color::Black)),
        ToastLevel::Error => ("[error]", Style::default().bg(Color::Red).fg(Color::White)),
    };
    let toast = Paragraph::new(format!("{prefix} {message}")).style(style);
    frame.render_widget(toast, area);
}
