//! Spotlight overlay: a single-line command prompt.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;
use ratatui::widgets::Paragraph;

use super::OverlayUpdate;
use super::render_utils::{
    InputHint, InputLine, OverlayConfig, render_input_line, render_overlay, render_separator,
};
use crate::effects::UiEffect;
use crate::state::TuiState;

pub const PLACEHOLDER: &str = "Ask Sayra or execute command...";

const BANNER: &str = "SAYRA v0.1 INTELLIGENCE";

#[derive(Debug, Clone, Default)]
pub struct SpotlightState {
    pub input: String,
}

impl SpotlightState {
    pub fn handle_key(&mut self, tui: &mut TuiState, key: KeyEvent) -> OverlayUpdate {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Esc => OverlayUpdate::close(),
            KeyCode::Enter => match tui.session.submit_command(&self.input) {
                Some(event) => {
                    self.input.clear();
                    OverlayUpdate::close().with_ui_effects(vec![UiEffect::Emit(event)])
                }
                None => OverlayUpdate::stay(),
            },
            KeyCode::Backspace => {
                self.input.pop();
                OverlayUpdate::stay()
            }
            KeyCode::Char('u') if ctrl => {
                self.input.clear();
                OverlayUpdate::stay()
            }
            KeyCode::Char(c) if !ctrl => {
                self.input.push(c);
                OverlayUpdate::stay()
            }
            _ => OverlayUpdate::stay(),
        }
    }

    /// Inserts pasted text as a single line.
    pub fn handle_paste(&mut self, text: &str) {
        let line = text.replace(['\r', '\n'], " ");
        self.input.push_str(&line);
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let hints = [
            InputHint::new("Enter", "execute"),
            InputHint::new("Esc", "close"),
        ];
        let layout = render_overlay(
            frame,
            area,
            anchor_row(area.height),
            &OverlayConfig {
                title: "Spotlight",
                border_color: Color::Cyan,
                width: 64,
                height: 6,
                hints: &hints,
            },
        );

        let input_area = Rect::new(layout.body.x, layout.body.y, layout.body.width, 1);
        render_input_line(
            frame,
            input_area,
            &InputLine {
                value: &self.input,
                placeholder: Some(PLACEHOLDER),
                prompt: "⌕ ",
                prompt_color: Color::Cyan,
                text_color: Color::White,
                placeholder_color: Color::DarkGray,
                cursor_color: Color::Cyan,
            },
        );

        render_separator(frame, layout.body, 1);

        if layout.body.height > 2 {
            let banner_area = Rect::new(layout.body.x, layout.body.y + 2, layout.body.width, 1);
            frame.render_widget(
                Paragraph::new(Span::styled(
                    BANNER,
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::ITALIC),
                )),
                banner_area,
            );
        }
    }
}

/// Sits in the upper part of the screen rather than dead centre.
fn anchor_row(height: u16) -> u16 {
    height / 5 * 2
}
