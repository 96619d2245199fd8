//! Colours.
//!
//! Semantic ANSI colours, so the terminal's palette decides the exact shades.

use ratatui::style::{Color, Modifier, Style};

/// Outline entry style by nesting depth.
///
/// Entries without a destination cannot be opened and are dimmed.
pub fn style_for_outline_depth(depth: usize, navigable: bool) -> Style {
    if !navigable {
        return dim();
    }
    match depth {
        0 => Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
        1 => Style::default().fg(Color::Green),
        2 => Style::default().fg(Color::Yellow),
        _ => Style::default().fg(Color::Blue),
    }
}

/// Border of a page drawn without an image.
pub fn page_frame() -> Style {
    Style::default().fg(Color::DarkGray)
}

pub fn dim() -> Style {
    Style::default().fg(Color::Indexed(245))
}

pub fn status_bar() -> Style {
    Style::default().bg(Color::DarkGray).fg(Color::White)
}

pub fn input_bar() -> Style {
    Style::default().bg(Color::Blue).fg(Color::White)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_level_outline_entries_are_bold() {
        let style = style_for_outline_depth(0, true);
        assert!(style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(style.fg, Some(Color::Cyan));
    }

    #[test]
    fn test_unreachable_outline_entries_are_dimmed() {
        assert_eq!(style_for_outline_depth(0, false), dim());
        assert_eq!(style_for_outline_depth(4, false), dim());
    }
}
