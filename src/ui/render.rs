use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Padding, Paragraph};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::Model;
use crate::engine::RenderStatus;

use super::{DOC_WIDTH_PERCENT, DOCUMENT_LEFT_PADDING, TOC_WIDTH_PERCENT, images, overlays, status};

pub fn split_main_columns(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(TOC_WIDTH_PERCENT),
            Constraint::Percentage(DOC_WIDTH_PERCENT),
        ])
        .split(area)
}

pub fn document_content_width(total_width: u16, toc_visible: bool) -> u16 {
    let area = Rect::new(0, 0, total_width, 1);
    let doc_width = if toc_visible {
        split_main_columns(area)[1].width
    } else {
        total_width
    };
    doc_width.saturating_sub(DOCUMENT_LEFT_PADDING).max(1)
}

/// Outline row under terminal row `row` of the panel at `toc_area`.
pub fn outline_row_at(model: &Model, toc_area: Rect, row: u16) -> Option<usize> {
    if row <= toc_area.y || row >= toc_area.y + toc_area.height.saturating_sub(1) {
        return None;
    }
    let count = model.toc_entry_count();
    let inner_height = toc_area.height.saturating_sub(2) as usize;
    if count == 0 || inner_height == 0 {
        return None;
    }
    let start = model
        .toc_scroll_offset
        .min(count.saturating_sub(inner_height));
    let idx = start + (row - toc_area.y - 1) as usize;
    (idx < count).then_some(idx)
}

/// Render the complete UI.
pub fn render(model: &mut Model, frame: &mut Frame) {
    let area = frame.area();

    if model.toc_visible() {
        let chunks = split_main_columns(area);
        render_outline(model, frame, chunks[0]);
        render_document(model, frame, chunks[1]);
    } else {
        render_document(model, frame, area);
    }

    if model.help_visible {
        overlays::render_help_overlay(model, frame, area);
    }
}

fn render_outline(model: &Model, frame: &mut Frame, area: Rect) {
    let Some(outline) = model.preview.outline() else {
        return;
    };
    let rows = model.toc_rows();
    let visible_rows = area.height.saturating_sub(2) as usize;
    let max_start = rows.len().saturating_sub(visible_rows);
    let start = model.toc_scroll_offset.min(max_start);
    let query = model.preview.outline_query().trim();
    let inner_width = area.width.saturating_sub(2) as usize;

    let items: Vec<Line> = rows
        .iter()
        .enumerate()
        .skip(start)
        .take(visible_rows)
        .filter_map(|(i, id)| outline.node(*id).map(|node| (i, node)))
        .map(|(i, node)| {
            let selected = model.toc_selected == Some(i);
            let marker = if selected { ">" } else { " " };
            let indent = "  ".repeat(node.depth);
            let navigable = node.destination.is_some();
            let base = super::style::style_for_outline_depth(node.depth, navigable);
            let style = if selected { base.reversed() } else { base };
            let prefix = format!("{marker}{indent} ");
            let title = fit_width(&node.title, inner_width.saturating_sub(prefix.width()));
            let mut spans = vec![Span::styled(prefix, style)];
            spans.extend(highlight_spans(&title, query, style));
            Line::from(spans)
        })
        .collect();

    let title = if model.search_query.is_some() {
        format!("Outline ({}/{})", rows.len(), outline.len())
    } else {
        "Outline".to_string()
    };
    let toc_block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(if model.toc_focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        });

    let body = if items.is_empty() {
        Paragraph::new(Line::styled("  no matches", super::style::dim()))
    } else {
        Paragraph::new(items)
    };
    frame.render_widget(body.block(toc_block), area);
}

fn render_document(model: &mut Model, frame: &mut Frame, area: Rect) {
    let input_active = model.search_query.is_some() || model.goto_input.is_some();
    let toast_active = model.active_toast().is_some();
    let footer_rows = 1 + u16::from(input_active) + u16::from(toast_active);
    let doc_outer_area = Rect {
        height: area.height.saturating_sub(footer_rows),
        ..area
    };
    let input_area = Rect {
        y: area.y + area.height.saturating_sub(1 + u16::from(input_active)),
        height: 1,
        ..area
    };
    let toast_area = Rect {
        y: area.y
            + area
                .height
                .saturating_sub(1 + u16::from(input_active) + u16::from(toast_active)),
        height: 1,
        ..area
    };
    let status_area = Rect {
        y: area.y + area.height.saturating_sub(1),
        height: 1,
        ..area
    };

    let doc_block = Block::default()
        .borders(Borders::NONE)
        .padding(Padding::left(DOCUMENT_LEFT_PADDING));
    let doc_area = doc_block.inner(doc_outer_area);
    // Clear first so image cells from the previous frame do not leak.
    frame.render_widget(Clear, doc_outer_area);
    frame.render_widget(doc_block, doc_outer_area);

    if model.preview.flow().is_empty() {
        let message = match model.preview.status() {
            RenderStatus::LoadingDocument => "Opening document...",
            _ if model.preview.is_busy() => "Rendering...",
            _ if model.preview.is_open() => "No pages rendered",
            _ => "No document",
        };
        frame.render_widget(
            Paragraph::new(Line::styled(message, super::style::dim())),
            doc_area,
        );
    } else {
        images::render_pages(model, frame, doc_area);
    }

    if toast_active {
        status::render_toast_bar(model, frame, toast_area);
    }
    if model.goto_input.is_some() {
        status::render_goto_bar(model, frame, input_area);
    } else if model.search_query.is_some() {
        status::render_search_bar(model, frame, input_area);
    }
    status::render_status_bar(model, frame, status_area);
}

/// Cut `text` to at most `max` display columns, marking the cut with an ellipsis.
fn fit_width(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    let budget = max.saturating_sub(1);
    let mut used = 0;
    let mut out = String::new();
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(ch);
    }
    if max > 0 {
        out.push('\u{2026}');
    }
    out
}

/// Split `text` into spans, marking case-insensitive occurrences of `query`.
fn highlight_spans(text: &str, query: &str, style: Style) -> Vec<Span<'static>> {
    if query.is_empty() {
        return vec![Span::styled(text.to_string(), style)];
    }
    let needle = query.to_lowercase();
    // Lowercasing can change byte lengths outside ASCII, so matches are found
    // in the folded text and mapped back to source char boundaries.
    let mut folded = String::with_capacity(text.len());
    let mut bounds = Vec::with_capacity(text.len() + 1);
    for (at, ch) in text.char_indices() {
        bounds.push((folded.len(), at));
        folded.extend(ch.to_lowercase());
    }
    bounds.push((folded.len(), text.len()));
    let to_source = |folded_at: usize| {
        bounds
            .binary_search_by_key(&folded_at, |&(f, _)| f)
            .ok()
            .map(|i| bounds[i].1)
    };

    let mut out = Vec::new();
    let mut plain_from = 0usize;
    let mut search_at = 0usize;
    while let Some(rel) = folded[search_at..].find(&needle) {
        let start = search_at + rel;
        let end = start + needle.len();
        if let (Some(a), Some(b)) = (to_source(start), to_source(end)) {
            if a > plain_from {
                out.push(Span::styled(text[plain_from..a].to_string(), style));
            }
            out.push(Span::styled(
                text[a..b].to_string(),
                style.bg(Color::Yellow).fg(Color::Black),
            ));
            plain_from = b;
            search_at = end;
        } else {
            // Match splits a folded character; skip past it.
            search_at = start + folded[start..].chars().next().map_or(1, char::len_utf8);
        }
    }
    if plain_from < text.len() {
        out.push(Span::styled(text[plain_from..].to_string(), style));
    }
    out
}
