use ratatui::layout::Flex;
use ratatui::prelude::*;
use ratatui::widgets::{Block, BorderType, Clear, Paragraph};

use crate::app::Model;

/// Key column width in the help table.
const KEY_COLUMN: usize = 20;

const BINDINGS: &[(&str, &[(&str, &str)])] = &[
    (
        "Scrolling",
        &[
            ("j k \u{2193} \u{2191}", "Scroll one row"),
            ("Space PgDn", "Page down"),
            ("b PgUp", "Page up"),
            ("Ctrl-d Ctrl-u", "Half a screen"),
            ("g G", "Top / end of rendered pages"),
            ("wheel", "Scroll"),
        ],
    ),
    (
        "Pages",
        &[(":", "Go to page"), ("] [", "Next / previous page")],
    ),
    (
        "Outline",
        &[
            ("t", "Toggle outline"),
            ("T", "Toggle outline and focus it"),
            ("Tab", "Move focus"),
            ("Enter / click", "Open the selected entry"),
            ("/", "Filter entries"),
            ("Esc", "Clear the filter"),
        ],
    ),
    ("Other", &[("? F1", "This help"), ("q Ctrl-c", "Quit")]),
];

fn help_lines(model: &Model) -> Vec<Line<'static>> {
    let heading = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);
    let key = Style::default().fg(Color::Cyan);

    let mut lines = Vec::new();
    for (section, rows) in BINDINGS {
        lines.push(Line::styled(*section, heading));
        lines.extend(rows.iter().map(|(keys, action)| {
            Line::from(vec![
                Span::styled(format!("  {keys:<KEY_COLUMN$}"), key),
                Span::raw(*action),
            ])
        }));
        lines.push(Line::default());
    }

    let describe = |path: Option<&std::path::PathBuf>, missing: &str| {
        path.map_or_else(|| missing.to_owned(), |p| p.display().to_string())
    };
    lines.push(Line::styled("Config", heading));
    lines.push(Line::raw(format!(
        "  Global: {}",
        describe(model.config_global_path.as_ref(), "<unknown>")
    )));
    lines.push(Line::raw(format!(
        "  Local override: {}",
        describe(model.config_local_path.as_ref(), "<none>")
    )));
    lines
}

pub fn render_help_overlay(model: &Model, frame: &mut Frame, area: Rect) {
    let lines = help_lines(model);
    let popup = popup_area(area, 64, lines.len() + 4);

    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .title(" Help ")
        .title_bottom(Line::styled(" j/k scroll \u{2502} any key closes ", super::style::dim()))
        .style(Style::default().bg(Color::Black).fg(Color::White));
    let inner = block.inner(popup).inner(Margin::new(1, 0));

    frame.render_widget(Clear, popup);
    frame.render_widget(block, popup);
    if inner.is_empty() {
        return;
    }

    let overflow = lines.len().saturating_sub(usize::from(inner.height));
    let offset = u16::try_from(model.help_scroll_offset.min(overflow)).unwrap_or(u16::MAX);
    frame.render_widget(Paragraph::new(lines).scroll((offset, 0)), inner);
}

/// Centre a box of at most `width` x `height` cells inside `area`.
fn popup_area(area: Rect, width: u16, height: usize) -> Rect {
    let height = u16::try_from(height).unwrap_or(u16::MAX);
    let [row] = Layout::vertical([Constraint::Max(height)])
        .flex(Flex::Center)
        .areas(area);
    let [popup] = Layout::horizontal([Constraint::Max(width)])
        .flex(Flex::Center)
        .areas(row);
    popup
}
