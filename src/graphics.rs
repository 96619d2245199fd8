//! Terminal graphics for page surfaces.
//!
//! The picker chooses the best protocol the terminal answers for (Kitty, Sixel,
//! iTerm2) and falls back to Unicode half-blocks.

#[cfg(unix)]
use std::time::Duration;

use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use ratatui_image::picker::Picker;
#[cfg(unix)]
use ratatui_image::picker::cap_parser::QueryStdioOptions;

#[cfg(unix)]
const PICKER_QUERY_TIMEOUT: Duration = Duration::from_millis(250);

/// Create a picker for terminal image rendering.
///
/// Must run before the terminal enters raw mode: the capability query talks to stdio.
pub fn create_picker(force_half_cell: bool) -> Option<Picker> {
    let picker = if force_half_cell {
        Picker::halfblocks()
    } else {
        query_terminal()?
    };
    crate::perf::log_event(
        "graphics.create_picker",
        format!(
            "forced={force_half_cell} term={} protocol={:?}",
            std::env::var("TERM").as_deref().unwrap_or("<unset>"),
            picker.protocol_type()
        ),
    );
    Some(picker)
}

#[cfg(unix)]
fn query_terminal() -> Option<Picker> {
    Picker::from_query_stdio_with_options(query_options()).ok()
}

/// The stdio query can leave a reader parked on the console input outside unix.
#[cfg(not(unix))]
fn query_terminal() -> Option<Picker> {
    Some(Picker::halfblocks())
}

#[cfg(unix)]
fn query_options() -> QueryStdioOptions {
    QueryStdioOptions {
        timeout: PICKER_QUERY_TIMEOUT,
        ..QueryStdioOptions::default()
    }
}

/// Scale a page surface to fill `cols` x `rows` terminal cells.
///
/// `font_size` is the cell size in pixels reported by the picker.
pub fn page_image(
    surface: &RgbaImage,
    cols: u16,
    rows: u16,
    font_size: (u16, u16),
    halfblocks: bool,
) -> DynamicImage {
    let width_px = u32::from(cols.max(1)) * u32::from(font_size.0.max(1));
    let height_px = u32::from(rows.max(1)) * u32::from(font_size.1.max(1));
    // Nearest-neighbour aliases badly once half-blocks halve the vertical resolution.
    let filter = if halfblocks {
        FilterType::CatmullRom
    } else {
        FilterType::Triangle
    };
    DynamicImage::ImageRgba8(image::imageops::resize(surface, width_px, height_px, filter))
}

/// Colour-related terminal environment.
#[derive(Debug, Default, Clone, Copy)]
struct TermEnv<'a> {
    forced: Option<&'a str>,
    program: Option<&'a str>,
    colorterm: Option<&'a str>,
    term: Option<&'a str>,
}

impl TermEnv<'_> {
    fn truecolor(&self) -> bool {
        if let Some(forced) = self.forced {
            return matches!(
                forced.to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        // Terminal.app has no 24-bit colour.
        if self.program == Some("Apple_Terminal") {
            return false;
        }
        let mentions = |value: Option<&str>, needles: &[&str]| {
            value.is_some_and(|v| {
                let v = v.to_ascii_lowercase();
                needles.iter().any(|n| v.contains(n))
            })
        };
        mentions(self.colorterm, &["truecolor", "24bit"])
            || mentions(self.term, &["direct", "truecolor"])
    }
}

/// Whether terminal output should be treated as truecolor-capable.
///
/// `PAGEWISE_TRUECOLOR` overrides detection.
pub fn supports_truecolor_terminal() -> bool {
    let forced = std::env::var("PAGEWISE_TRUECOLOR").ok();
    let program = std::env::var("TERM_PROGRAM").ok();
    let colorterm = std::env::var("COLORTERM").ok();
    let term = std::env::var("TERM").ok();
    TermEnv {
        forced: forced.as_deref(),
        program: program.as_deref(),
        colorterm: colorterm.as_deref(),
        term: term.as_deref(),
    }
    .truecolor()
}

/// Channel levels of the xterm 6x6x6 colour cube.
const CUBE_LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];

/// Nearest entry of the xterm colour cube.
pub fn rgb_to_xterm_256(r: u8, g: u8, b: u8) -> u8 {
    let level = |v: u8| {
        (0u8..)
            .zip(CUBE_LEVELS)
            .min_by_key(|(_, level)| level.abs_diff(v))
            .map_or(0, |(idx, _)| idx)
    };
    16 + 36 * level(r) + 6 * level(g) + level(b)
}
