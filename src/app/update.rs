use std::time::Instant;

use crate::app::{Model, ToastLevel};
use crate::document::PageNumber;
use crate::error::NavigationError;
use crate::ui::UNITS_PER_ROW;

/// All possible events and actions in the viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    // Scrolling
    /// Scroll up by n rows
    ScrollUp(usize),
    /// Scroll down by n rows
    ScrollDown(usize),
    PageUp,
    PageDown,
    HalfPageUp,
    HalfPageDown,
    /// Scroll to the first rendered page
    GoToTop,
    /// Scroll to the end of the rendered flow
    GoToBottom,

    // Page navigation
    /// Clear the flow and render from a page
    GoToPage(PageNumber),
    NextPage,
    PrevPage,
    /// Open the go-to-page prompt
    StartGoTo,
    /// Update the go-to-page prompt
    GoToInput(String),
    SubmitGoTo,
    CancelGoTo,

    // Outline
    /// Toggle outline panel visibility
    ToggleToc,
    /// Toggle outline panel and focus it
    ToggleTocFocus,
    TocUp,
    TocDown,
    TocScrollUp,
    TocScrollDown,
    /// Jump to the selected outline entry
    TocSelect,
    /// Select and jump to an outline row
    TocClick(usize),
    /// Switch focus between outline and pages
    SwitchFocus,

    // Outline search
    StartSearch,
    SearchInput(String),
    ClearSearch,

    // Help
    ToggleHelp,
    HideHelp,
    HelpScrollUp,
    HelpScrollDown,

    // Window
    /// Terminal resized
    Resize(u16, u16),
    /// Redraw screen
    Redraw,

    Quit,
}

/// Apply `msg` to the model.
///
/// Engine work started here (page requests, navigation) completes on later
/// [`Model::tick`] calls.
pub fn update(mut model: Model, msg: Message) -> Model {
    let now = Instant::now();
    let page_rows = model.document_rows().max(1);

    match msg {
        Message::ScrollUp(n) => scroll_rows(&mut model, -rows(n), now),
        Message::ScrollDown(n) => scroll_rows(&mut model, rows(n), now),
        Message::PageUp => scroll_rows(&mut model, -f32::from(page_rows), now),
        Message::PageDown => scroll_rows(&mut model, f32::from(page_rows), now),
        Message::HalfPageUp => scroll_rows(&mut model, -f32::from(page_rows / 2), now),
        Message::HalfPageDown => scroll_rows(&mut model, f32::from(page_rows / 2), now),
        Message::GoToTop => {
            model.preview.scroll_to(0.0, now);
        }
        Message::GoToBottom => {
            model.preview.scroll_to_bottom(now);
        }

        Message::GoToPage(page) => go_to_page(&mut model, page, now),
        Message::NextPage => {
            let current = model.preview.current_page().unwrap_or(0);
            if current < model.preview.total_pages() {
                go_to_page(&mut model, current + 1, now);
            }
        }
        Message::PrevPage => {
            let current = model.preview.current_page().unwrap_or(1);
            if current > 1 {
                go_to_page(&mut model, current - 1, now);
            }
        }
        Message::StartGoTo => {
            model.goto_input = Some(String::new());
        }
        Message::GoToInput(input) => {
            model.goto_input = Some(input.chars().filter(char::is_ascii_digit).collect());
        }
        Message::SubmitGoTo => {
            let input = model.goto_input.take().unwrap_or_default();
            match input.parse::<PageNumber>() {
                Ok(page) => go_to_page(&mut model, page, now),
                Err(_) if input.is_empty() => {}
                Err(_) => model.show_toast(ToastLevel::Warning, format!("Not a page: {input}")),
            }
        }
        Message::CancelGoTo => {
            model.goto_input = None;
        }

        Message::ToggleToc => {
            toggle_outline(&mut model, false);
        }
        Message::ToggleTocFocus => {
            toggle_outline(&mut model, true);
        }
        Message::TocUp => {
            if let Some(sel) = model.toc_selected {
                let next = sel.saturating_sub(1);
                model.toc_selected = Some(next);
                if next < model.toc_scroll_offset {
                    model.toc_scroll_offset = next;
                }
            }
        }
        Message::TocDown => {
            if let Some(sel) = model.toc_selected {
                let max = model.toc_entry_count().saturating_sub(1);
                let next = (sel + 1).min(max);
                model.toc_selected = Some(next);
                let visible = model.toc_visible_rows();
                if visible > 0 {
                    let bottom = model.toc_scroll_offset + visible.saturating_sub(1);
                    if next > bottom {
                        model.toc_scroll_offset = (next + 1)
                            .saturating_sub(visible)
                            .min(model.max_toc_scroll_offset());
                    }
                }
            }
        }
        Message::TocScrollUp => {
            model.toc_scroll_offset = model.toc_scroll_offset.saturating_sub(1);
        }
        Message::TocScrollDown => {
            model.toc_scroll_offset =
                (model.toc_scroll_offset + 1).min(model.max_toc_scroll_offset());
        }
        Message::TocSelect => {
            if let Some(sel) = model.toc_selected {
                select_outline_row(&mut model, sel, now);
            }
        }
        Message::TocClick(idx) => {
            model.toc_selected = Some(idx);
            select_outline_row(&mut model, idx, now);
        }
        Message::SwitchFocus => {
            if model.toc_visible() {
                model.toc_focused = !model.toc_focused;
            }
        }

        Message::StartSearch => {
            if model.preview.outline_available() {
                if !model.toc_visible() {
                    model.preview.set_outline_open(true);
                    model.reflow_layout();
                }
                model.toc_focused = true;
                model.search_query = Some(model.preview.outline_query().to_string());
            } else {
                model.show_toast(ToastLevel::Info, "This document has no outline");
            }
        }
        Message::SearchInput(query) => {
            model.preview.set_outline_query(query.as_str());
            model.search_query = Some(query);
            model.toc_selected = Some(0);
            model.toc_scroll_offset = 0;
            model.clamp_toc_selection();
        }
        Message::ClearSearch => {
            model.search_query = None;
            model.preview.set_outline_query("");
            model.clamp_toc_selection();
        }

        Message::ToggleHelp => {
            model.help_visible = !model.help_visible;
            model.help_scroll_offset = 0;
        }
        Message::HideHelp => {
            model.help_visible = false;
        }
        Message::HelpScrollUp => {
            model.help_scroll_offset = model.help_scroll_offset.saturating_sub(1);
        }
        Message::HelpScrollDown => {
            model.help_scroll_offset += 1;
        }

        Message::Resize(width, height) => {
            model.set_terminal_size(width, height);
            model.reflow_layout();
            model.clamp_toc_selection();
        }
        Message::Redraw => {}

        Message::Quit => {
            model.should_quit = true;
        }
    }
    model.collect_notices();
    model
}

#[allow(clippy::cast_precision_loss)]
fn rows(n: usize) -> f32 {
    n as f32
}

fn scroll_rows(model: &mut Model, delta_rows: f32, now: Instant) {
    model.preview.scroll_by(delta_rows * UNITS_PER_ROW, now);
}

fn go_to_page(model: &mut Model, page: PageNumber, now: Instant) {
    match model.preview.navigate_to_page(page, now) {
        Ok(()) => {
            crate::perf::log_event("app.navigate", format!("page={page}"));
        }
        Err(NavigationError::Busy) => {
            model.show_toast(ToastLevel::Info, "Still rendering, try again");
        }
        // Reported through the error callback.
        Err(_) => {}
    }
}

fn toggle_outline(model: &mut Model, focus: bool) {
    if !model.preview.outline_available() {
        model.show_toast(ToastLevel::Info, "This document has no outline");
        return;
    }
    let open = model.preview.toggle_outline();
    model.toc_focused = open && focus;
    if !open {
        model.search_query = None;
    }
    if open && model.toc_selected.is_none() {
        model.toc_selected = Some(0);
    }
    model.clamp_toc_selection();
    model.reflow_layout();
}

fn select_outline_row(model: &mut Model, row: usize, now: Instant) {
    let Some(id) = model.toc_rows().get(row).copied() else {
        return;
    };
    let was_open = model.toc_visible();
    match model.preview.select_outline_node(id, now) {
        Ok(page) => {
            model.toc_focused = false;
            model.search_query = None;
            model.preview.set_outline_query("");
            crate::perf::log_event("app.outline.select", format!("node={} page={page}", id.0));
        }
        Err(NavigationError::Busy) => {
            model.show_toast(ToastLevel::Info, "Still rendering, try again");
        }
        Err(_) => {}
    }
    // The panel closes on a successful selection and gives its columns back.
    if was_open != model.toc_visible() {
        model.reflow_layout();
    }
}
