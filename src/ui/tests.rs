use std::path::PathBuf;
use std::time::Instant;

use ratatui::Terminal;
use ratatui::backend::TestBackend;
use ratatui_image::picker::Picker;

use super::*;
use crate::app::{Message, Model, update};
use crate::document::{
    Destination, DocumentSource, ExplicitLocation, FixtureLoader, FixtureManifest, OutlineItem,
    PageRef,
};
use crate::engine::{InlineExecutor, PreviewConfig, PreviewController};

fn at(num: u32) -> Option<Destination> {
    Some(Destination::Explicit(ExplicitLocation::page(PageRef::new(num, 0))))
}

fn manifest(with_outline: bool) -> FixtureManifest {
    let manifest = FixtureManifest::uniform(10, 300.0, 400.0);
    if !with_outline {
        return manifest;
    }
    manifest.with_outline(vec![
        OutlineItem::new("Introduction", at(1)),
        OutlineItem::new("Chapter 1", at(3))
            .with_children(vec![OutlineItem::new("Section 1.1", at(4))]),
        OutlineItem::new("Appendix", None),
    ])
}

fn opened_model(with_outline: bool, size: (u16, u16)) -> Model {
    let preview = PreviewController::new(
        FixtureLoader,
        InlineExecutor::new(),
        PreviewConfig::default(),
        cols_to_units(size.0),
        rows_to_units(size.1),
    );
    let mut model = Model::new(PathBuf::from("manual.json"), preview, size);
    let bytes = manifest(with_outline).to_json().unwrap().into_bytes();
    model.open(DocumentSource::Bytes(bytes)).unwrap();
    model.preview.run_until_idle();
    model.tick(Instant::now());
    model
}

fn draw(model: &mut Model) -> String {
    let (width, height) = model.terminal_size();
    let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
    terminal.draw(|frame| render(model, frame)).unwrap();
    let buffer = terminal.backend().buffer();
    let mut out = String::new();
    for y in 0..buffer.area.height {
        for x in 0..buffer.area.width {
            out.push_str(buffer[(x, y)].symbol());
        }
        out.push('\n');
    }
    out
}

#[test]
fn test_empty_model_shows_no_document() {
    let mut model = Model::default();
    let screen = draw(&mut model);
    assert!(screen.contains("No document"), "{screen}");
    assert!(screen.contains("Page -"), "{screen}");
}

#[test]
fn test_status_bar_shows_page_indicator() {
    let mut model = opened_model(false, (80, 24));
    let screen = draw(&mut model);
    assert!(screen.contains("manual.json"), "{screen}");
    assert!(screen.contains("Page 1/10"), "{screen}");
    assert!(screen.contains("?:help"), "{screen}");
}

#[test]
fn test_status_bar_follows_navigation() {
    let model = opened_model(false, (80, 24));
    let mut model = update(model, Message::GoToPage(3));
    model.preview.run_until_idle();
    let screen = draw(&mut model);
    assert!(screen.contains("Page 3/10"), "{screen}");
}

#[test]
fn test_status_text_marks_rendering() {
    // One page does not cover 59 rows, so the initial pass is still running.
    let preview = PreviewController::new(
        FixtureLoader,
        InlineExecutor::new(),
        PreviewConfig::default(),
        cols_to_units(80),
        rows_to_units(59),
    );
    let mut model = Model::new(PathBuf::from("manual.json"), preview, (80, 60));
    let bytes = manifest(false).to_json().unwrap().into_bytes();
    model.open(DocumentSource::Bytes(bytes)).unwrap();
    assert!(status::status_text(&model).contains("[rendering]"));

    model.preview.run_until_idle();
    assert!(!status::status_text(&model).contains("[rendering]"));
}

#[test]
fn test_pages_without_images_draw_placeholders() {
    let mut model = opened_model(false, (80, 24));
    model.images_enabled = false;
    let screen = draw(&mut model);
    assert!(screen.contains(" Page 1 "), "{screen}");
    assert!(screen.contains("[page image]"), "{screen}");
}

#[test]
fn test_open_toast_is_drawn() {
    let mut model = opened_model(false, (80, 24));
    let screen = draw(&mut model);
    assert!(screen.contains("[info] manual.json: 10 pages"), "{screen}");
}

#[test]
fn test_outline_panel_lists_entries() {
    let model = opened_model(true, (80, 24));
    let mut model = update(model, Message::ToggleToc);
    let screen = draw(&mut model);
    assert!(screen.contains("Outline"), "{screen}");
    assert!(screen.contains("> Introduction"), "{screen}");
    assert!(screen.contains("   Section 1.1"), "{screen}");
    assert!(screen.contains("Appendix"), "{screen}");
    assert!(screen.contains("[outline]"), "{screen}");
}

#[test]
fn test_outline_search_shows_counts() {
    let model = opened_model(true, (80, 24));
    let model = update(model, Message::StartSearch);
    let mut model = update(model, Message::SearchInput("section".to_string()));
    let screen = draw(&mut model);
    assert!(screen.contains("Outline (2/4)"), "{screen}");
    assert!(screen.contains("/section  [2/4]"), "{screen}");
    assert!(!screen.contains("Appendix"), "{screen}");
}

#[test]
fn test_outline_search_without_matches() {
    let model = opened_model(true, (80, 24));
    let model = update(model, Message::StartSearch);
    let mut model = update(model, Message::SearchInput("zzz".to_string()));
    let screen = draw(&mut model);
    assert!(screen.contains("no matches"), "{screen}");
    assert!(screen.contains("Outline (0/4)"), "{screen}");
}

#[test]
fn test_goto_bar_shows_range() {
    let model = opened_model(false, (80, 24));
    let model = update(model, Message::StartGoTo);
    let mut model = update(model, Message::GoToInput("4".to_string()));
    let screen = draw(&mut model);
    assert!(screen.contains(":4  Enter: go to page (1-10)"), "{screen}");
}

#[test]
fn test_help_overlay_lists_bindings() {
    let model = opened_model(false, (80, 40));
    let mut model = update(model, Message::ToggleHelp);
    let screen = draw(&mut model);
    assert!(screen.contains("Help"), "{screen}");
    assert!(screen.contains("Go to page"), "{screen}");
    assert!(screen.contains("Toggle outline"), "{screen}");
    assert!(screen.contains("Local override: <none>"), "{screen}");
}

#[test]
fn test_help_overlay_survives_tiny_terminal() {
    let model = opened_model(false, (20, 5));
    let model = update(model, Message::ToggleHelp);
    let mut model = update(model, Message::HelpScrollDown);
    model.help_scroll_offset = 500;
    let screen = draw(&mut model);
    assert!(!screen.is_empty());
}

#[test]
fn test_outline_row_at_maps_panel_rows() {
    let model = opened_model(true, (80, 24));
    let model = update(model, Message::ToggleToc);
    let area = split_main_columns(ratatui::layout::Rect::new(0, 0, 80, 24))[0];
    assert_eq!(outline_row_at(&model, area, 0), None);
    assert_eq!(outline_row_at(&model, area, 1), Some(0));
    assert_eq!(outline_row_at(&model, area, 4), Some(3));
    assert_eq!(outline_row_at(&model, area, 5), None);
}

#[test]
fn test_page_cells_caps_width() {
    assert_eq!(page_cells(300.0, 400.0, 80), (38, 25));
    assert_eq!(page_cells(1200.0, 16.0, 80), (80, 1));
    assert_eq!(page_cells(0.0, 0.0, 0), (1, 1));
}

#[test]
fn test_units_to_row_floors() {
    assert_eq!(units_to_row(15.9), 0);
    assert_eq!(units_to_row(16.0), 1);
    assert_eq!(units_to_row(-1.0), -1);
}

#[test]
fn test_page_protocols_built_for_visible_pages() {
    let mut model = opened_model(false, (80, 24)).with_picker(Some(Picker::halfblocks()));
    assert!(model.page_protocols.is_empty());
    model.load_visible_pages();
    assert!(model.page_protocols.contains_key(&1));

    let screen = draw(&mut model);
    assert!(screen.contains("Page 1/10"), "{screen}");
}

#[test]
fn test_page_protocols_dropped_after_navigation() {
    let mut model = opened_model(false, (80, 24)).with_picker(Some(Picker::halfblocks()));
    model.load_visible_pages();
    let mut model = update(model, Message::GoToPage(6));
    model.preview.run_until_idle();
    model.load_visible_pages();
    assert!(!model.page_protocols.contains_key(&1));
    assert!(model.page_protocols.contains_key(&6));
}

#[test]
fn test_disabled_images_build_no_protocols() {
    let mut model = opened_model(false, (80, 24)).with_picker(Some(Picker::halfblocks()));
    model.images_enabled = false;
    model.load_visible_pages();
    assert!(model.page_protocols.is_empty());
}
