//! Terminal UI components.
//!
//! - [`render`]: page flow, outline panel and footer bars
//! - [`style`]: colours
//!
//! The engine lays pages out in layout units; one terminal cell covers
//! [`UNITS_PER_COL`] x [`UNITS_PER_ROW`] of them.

pub mod style;

mod images;
mod overlays;
mod render;
mod status;

pub use render::{document_content_width, outline_row_at, render, split_main_columns};

pub const DOCUMENT_LEFT_PADDING: u16 = 2;
pub const TOC_WIDTH_PERCENT: u16 = 30;
pub const DOC_WIDTH_PERCENT: u16 = 70;

/// Layout units covered by one terminal row.
pub const UNITS_PER_ROW: f32 = 16.0;
/// Layout units covered by one terminal column.
pub const UNITS_PER_COL: f32 = 8.0;

pub fn rows_to_units(rows: u16) -> f32 {
    f32::from(rows) * UNITS_PER_ROW
}

pub fn cols_to_units(cols: u16) -> f32 {
    f32::from(cols) * UNITS_PER_COL
}

/// Row offset of a layout position, rounded towards the top.
#[allow(clippy::cast_possible_truncation)]
pub fn units_to_row(units: f32) -> i32 {
    (units / UNITS_PER_ROW).floor() as i32
}

/// Cell box of a page: width capped at `max_cols`, never empty.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn page_cells(width: f32, height: f32, max_cols: u16) -> (u16, u16) {
    let cols = (width / UNITS_PER_COL).ceil().clamp(1.0, f32::from(max_cols.max(1))) as u16;
    let rows = (height / UNITS_PER_ROW).ceil().clamp(1.0, f32::from(u16::MAX)) as u16;
    (cols, rows)
}

#[cfg(test)]
mod tests;
