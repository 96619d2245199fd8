use ratatui::buffer::Buffer;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui_image::protocol::StatefulProtocolType;
use ratatui_image::{CropOptions, Resize, StatefulImage};

use crate::app::Model;
use crate::document::PageNumber;
use crate::engine::flow::PageRecord;

use super::{page_cells, units_to_row};

/// Where a page lands in the document area, in rows relative to its top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PageSlot {
    number: PageNumber,
    top: i32,
    cols: u16,
    rows: u16,
}

impl PageSlot {
    fn locate(record: &PageRecord, scroll_top: f32, doc_area: Rect) -> Option<Self> {
        let (cols, rows) = page_cells(record.width(), record.height(), doc_area.width);
        let top = units_to_row(record.top() - scroll_top);
        let bottom = top + i32::from(rows);
        (bottom > 0 && top < i32::from(doc_area.height)).then_some(Self {
            number: record.number(),
            top,
            cols,
            rows,
        })
    }

    /// First page row on screen.
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    fn src_start(&self) -> u16 {
        (-self.top).max(0) as u16
    }

    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    fn dst_y(&self, doc_area: Rect) -> u16 {
        doc_area.y + self.top.max(0) as u16
    }

    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    fn visible_rows(&self, doc_area: Rect) -> u16 {
        let bottom = (self.top + i32::from(self.rows)).min(i32::from(doc_area.height));
        (bottom - self.top.max(0)).max(0) as u16
    }
}

/// Draw every page that intersects the viewport.
pub fn render_pages(model: &mut Model, frame: &mut Frame, doc_area: Rect) {
    let scroll_top = model.preview.flow().scroll_top();
    let slots: Vec<PageSlot> = model
        .preview
        .pages()
        .iter()
        .filter_map(|record| PageSlot::locate(record, scroll_top, doc_area))
        .collect();
    crate::perf::log_event(
        "render.pages",
        format!(
            "scroll_top={scroll_top:.1} doc_area={}x{} slots={} protocols={}",
            doc_area.width,
            doc_area.height,
            slots.len(),
            model.page_protocols.len()
        ),
    );

    let truecolor = crate::graphics::supports_truecolor_terminal();
    for slot in slots {
        match model.page_protocols.get_mut(&slot.number) {
            Some((protocol, width, height)) if model.images_enabled => {
                render_page_image(frame, doc_area, slot, protocol, (*width, *height), truecolor);
            }
            _ => render_placeholder(frame, doc_area, slot),
        }
    }
}

fn render_page_image(
    frame: &mut Frame,
    doc_area: Rect,
    slot: PageSlot,
    protocol: &mut ratatui_image::protocol::StatefulProtocol,
    size: (u16, u16),
    truecolor: bool,
) {
    let (img_width, img_height) = size;
    let visible_rows = slot.visible_rows(doc_area);
    let visible_cols = img_width.min(doc_area.width);
    if visible_rows == 0 || visible_cols == 0 {
        return;
    }
    let src_start = slot.src_start();
    let dst_y = slot.dst_y(doc_area);

    if matches!(protocol.protocol_type(), StatefulProtocolType::ITerm2(_)) {
        // iTerm2 stores the whole payload in one anchor cell, so rows cannot be
        // sliced out of a rendered buffer; crop the image instead.
        let crop = if src_start > 0 {
            Resize::Crop(Some(CropOptions {
                clip_top: true,
                clip_left: false,
            }))
        } else {
            Resize::Crop(None)
        };
        StatefulImage::default().resize(crop).render(
            Rect::new(doc_area.x, dst_y, visible_cols, visible_rows.min(img_height)),
            frame.buffer_mut(),
            protocol,
        );
        return;
    }

    let halfblocks = matches!(protocol.protocol_type(), StatefulProtocolType::Halfblocks(_));
    let temp_area = Rect::new(0, 0, img_width, img_height);
    let mut temp_buf = Buffer::empty(temp_area);
    let resize = if halfblocks {
        Resize::Scale(Some(image::imageops::FilterType::CatmullRom))
    } else {
        Resize::Scale(None)
    };
    StatefulImage::default()
        .resize(resize)
        .render(temp_area, &mut temp_buf, protocol);

    // Terminals without truecolor redraw indexed colours more reliably.
    if halfblocks && !truecolor {
        for cell in &mut temp_buf.content {
            if let Color::Rgb(r, g, b) = cell.fg {
                cell.fg = Color::Indexed(crate::graphics::rgb_to_xterm_256(r, g, b));
            }
            if let Color::Rgb(r, g, b) = cell.bg {
                cell.bg = Color::Indexed(crate::graphics::rgb_to_xterm_256(r, g, b));
            }
        }
    }

    blit(frame, &temp_buf, doc_area, slot, visible_cols);
    crate::perf::log_event(
        "render.page.blit",
        format!(
            "page={} src_start={src_start} dst_y={dst_y} rows={visible_rows} cols={visible_cols}",
            slot.number
        ),
    );
}

fn render_placeholder(frame: &mut Frame, doc_area: Rect, slot: PageSlot) {
    let cols = slot.cols.min(doc_area.width);
    let temp_area = Rect::new(0, 0, cols, slot.rows);
    let mut temp_buf = Buffer::empty(temp_area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(super::style::page_frame())
        .title(format!(" Page {} ", slot.number));
    let inner = block.inner(temp_area);
    block.render(temp_area, &mut temp_buf);
    if inner.height > 0 {
        Paragraph::new(Line::styled("[page image]", super::style::dim()))
            .alignment(Alignment::Center)
            .render(Rect { height: 1, ..inner }, &mut temp_buf);
    }
    blit(frame, &temp_buf, doc_area, slot, cols);
}

/// Copy the on-screen rows of a page buffer into the frame.
fn blit(frame: &mut Frame, temp_buf: &Buffer, doc_area: Rect, slot: PageSlot, cols: u16) {
    let src_start = slot.src_start();
    let dst_y = slot.dst_y(doc_area);
    let rows = slot.visible_rows(doc_area);
    let frame_buf = frame.buffer_mut();
    for row in 0..rows {
        let src_row = src_start + row;
        let dst_row = dst_y + row;
        if src_row >= temp_buf.area.height || dst_row >= frame_buf.area.bottom() {
            continue;
        }
        for col in 0..cols.min(temp_buf.area.width) {
            frame_buf[(doc_area.x + col, dst_row)] = temp_buf[(col, src_row)].clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(top: i32, rows: u16) -> PageSlot {
        PageSlot {
            number: 1,
            top,
            cols: 10,
            rows,
        }
    }

    #[test]
    fn test_slot_clipped_above_viewport() {
        let area = Rect::new(2, 0, 40, 20);
        let s = slot(-5, 12);
        assert_eq!(s.src_start(), 5);
        assert_eq!(s.dst_y(area), 0);
        assert_eq!(s.visible_rows(area), 7);
    }

    #[test]
    fn test_slot_clipped_below_viewport() {
        let area = Rect::new(2, 0, 40, 20);
        let s = slot(15, 12);
        assert_eq!(s.src_start(), 0);
        assert_eq!(s.dst_y(area), 15);
        assert_eq!(s.visible_rows(area), 5);
    }
}
