//! Thin vertical scrollbar for the live feed.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::widgets::Widget;

const THUMB_SYMBOL: &str = "┃";
const TRACK_SYMBOL: &str = "│";

/// Scrollbar drawn on the right edge of its area.
///
/// Hidden when the content fits. The thumb length is fixed for a given
/// content size and reaches the bottom exactly at the maximum offset.
#[derive(Debug, Clone)]
pub struct Scrollbar {
    total_lines: usize,
    viewport_height: usize,
    scroll_offset: usize,
    thumb_color: Color,
}

impl Scrollbar {
    pub fn new(total_lines: usize, viewport_height: usize, scroll_offset: usize) -> Self {
        Self {
            total_lines,
            viewport_height,
            scroll_offset,
            thumb_color: Color::Cyan,
        }
    }

    #[must_use]
    pub fn thumb_color(mut self, color: Color) -> Self {
        self.thumb_color = color;
        self
    }

    fn should_display(&self) -> bool {
        self.total_lines > self.viewport_height
    }

    /// Thumb start and length in track cells.
    fn thumb(&self, track_len: usize) -> (usize, usize) {
        let max_scroll = self.total_lines.saturating_sub(self.viewport_height).max(1);
        let thumb_len = (track_len * self.viewport_height.min(track_len))
            .div_ceil(self.total_lines.max(1))
            .clamp(1, track_len.max(1));
        let available = track_len.saturating_sub(thumb_len);
        let start = self.scroll_offset.min(max_scroll) * available / max_scroll;
        (start, thumb_len)
    }
}

impl Widget for Scrollbar {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if !self.should_display() || area.height == 0 || area.width == 0 {
            return;
        }

        let track_len = area.height as usize;
        let (start, len) = self.thumb(track_len);
        let x = area.x + area.width - 1;
        let thumb_style = Style::default().fg(self.thumb_color);
        let track_style = Style::default().fg(Color::DarkGray);

        for (idx, y) in (area.y..area.y + area.height).enumerate() {
            if idx >= start && idx < start + len {
                buf.set_string(x, y, THUMB_SYMBOL, thumb_style);
            } else {
                buf.set_string(x, y, TRACK_SYMBOL, track_style);
            }
        }
    }
}
