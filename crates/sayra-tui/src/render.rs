//! Pure view/render functions for the TUI.
//!
//! Functions here take `&AppState`, draw to a ratatui `Frame`, and never
//! return effects. The only write is the orb rectangle, recorded in a `Cell`
//! so the reducer can hit-test mouse clicks.
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ alert (if any)                       │
//! │               ╭────╮                 │
//! │               │orb │                 │
//! │               ╰────╯                 │
//! │             LISTENING …              │
//! │         last bot message             │
//! │ ● ONLINE  idle  endpoint   hints     │
//! └──────────────────────────────────────┘
//! ```

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::canvas::{Canvas, Circle};
use ratatui::widgets::{Paragraph, Wrap};
use sayra_core::session::{AlertLevel, AssistantMode, SessionState};

use crate::common::text::truncate_with_ellipsis;
use crate::overlays::OverlayExt;
use crate::overlays::render_utils::{InputHint, hint_spans};
use crate::state::{AppState, TuiState};

pub const TOAST_PLACEHOLDER: &str = "Sayra Systems Initializing...";

const ALERT_HEIGHT: u16 = 1;
const LABEL_HEIGHT: u16 = 1;
const TOAST_HEIGHT: u16 = 2;
const STATUS_HEIGHT: u16 = 1;

/// Steady rings of the orb body.
const ORB_RINGS: [f64; 4] = [0.18, 0.34, 0.5, 0.64];

/// Frames in one pulse cycle of the outer ring.
const PULSE_STEPS: usize = 8;

/// Renders the entire TUI to the frame.
pub fn render(app: &AppState, frame: &mut Frame) {
    let area = frame.area();
    let state = &app.tui;

    let [alert_area, orb_region, label_area, toast_area, status_area] = Layout::vertical([
        Constraint::Length(ALERT_HEIGHT),
        Constraint::Min(0),
        Constraint::Length(LABEL_HEIGHT),
        Constraint::Length(TOAST_HEIGHT),
        Constraint::Length(STATUS_HEIGHT),
    ])
    .areas(area);

    render_alert(frame, alert_area, &state.session);

    let orb_area = orb_rect(orb_region);
    state.orb_area.set(orb_area);
    render_orb(frame, orb_area, state);
    render_mode_label(frame, label_area, &state.session);
    render_toast(frame, toast_area, &state.session);
    render_status_line(frame, status_area, state);

    app.overlay.render(frame, area, state);
}

/// Colour of the orb for `mode`; dark grey while offline.
pub fn orb_color(mode: &AssistantMode, online: bool) -> Color {
    if !online {
        return Color::DarkGray;
    }
    match mode {
        AssistantMode::Idle => Color::Cyan,
        AssistantMode::Listening => Color::Red,
        AssistantMode::Processing => Color::Magenta,
        AssistantMode::Other(_) => Color::Yellow,
    }
}

/// Largest centred box that looks round: terminal cells are about twice
/// as tall as they are wide.
fn orb_rect(region: Rect) -> Rect {
    let height = region.height.min(region.width / 2);
    let width = height.saturating_mul(2);
    Rect::new(
        region.x + region.width.saturating_sub(width) / 2,
        region.y + region.height.saturating_sub(height) / 2,
        width,
        height,
    )
}

/// Radius of the pulsing ring for a spinner frame.
fn pulse_radius(frame: usize) -> f64 {
    let step = frame % PULSE_STEPS;
    let phase = step.min(PULSE_STEPS - step);
    0.72 + 0.05 * phase as f64
}

/// Pulse ring for active modes. It keeps running offline; the orb colour
/// already dims it.
fn orb_pulse(mode: &AssistantMode, frame: usize) -> Option<f64> {
    mode.is_active().then(|| pulse_radius(frame))
}

fn render_orb(frame: &mut Frame, area: Rect, state: &TuiState) {
    if area.width == 0 || area.height == 0 {
        return;
    }

    let session = &state.session;
    let online = session.status.is_online();
    let mode = session.mode();
    let color = orb_color(mode, online);
    let pulse = orb_pulse(mode, state.spinner_frame);

    let canvas = Canvas::default()
        .marker(Marker::Braille)
        .x_bounds([-1.0, 1.0])
        .y_bounds([-1.0, 1.0])
        .paint(move |ctx| {
            for radius in ORB_RINGS {
                ctx.draw(&Circle {
                    x: 0.0,
                    y: 0.0,
                    radius,
                    color,
                });
            }
            if let Some(radius) = pulse {
                ctx.draw(&Circle {
                    x: 0.0,
                    y: 0.0,
                    radius,
                    color,
                });
            }
        });
    frame.render_widget(canvas, area);
}

fn render_mode_label(frame: &mut Frame, area: Rect, session: &SessionState) {
    let mut label = session.mode().as_str().to_uppercase();
    if session.mode.is_pending() {
        label.push_str(" …");
    }
    let color = orb_color(session.mode(), session.status.is_online());
    frame.render_widget(
        Paragraph::new(Span::styled(
            label,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center),
        area,
    );
}

fn render_toast(frame: &mut Frame, area: Rect, session: &SessionState) {
    let (text, style) = match &session.toast {
        Some(text) => (text.as_str(), Style::default().fg(Color::White)),
        None => (
            TOAST_PLACEHOLDER,
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        ),
    };
    frame.render_widget(
        Paragraph::new(Span::styled(text, style))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        area,
    );
}

fn alert_style(level: &AlertLevel) -> Style {
    let color = match level {
        AlertLevel::Info => Color::Cyan,
        AlertLevel::Warning => Color::Yellow,
        AlertLevel::Error => Color::Red,
        AlertLevel::Other(_) => Color::Gray,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

fn render_alert(frame: &mut Frame, area: Rect, session: &SessionState) {
    let Some(alert) = &session.alert else {
        return;
    };
    let text = truncate_with_ellipsis(&alert.message, area.width as usize);
    frame.render_widget(
        Paragraph::new(Span::styled(text, alert_style(&alert.level))).alignment(Alignment::Center),
        area,
    );
}

fn render_status_line(frame: &mut Frame, area: Rect, state: &TuiState) {
    let session = &state.session;
    let (status, status_color) = if session.status.is_online() {
        ("ONLINE", Color::Green)
    } else {
        ("OFFLINE", Color::Red)
    };

    let mut spans = vec![
        Span::styled("● ", Style::default().fg(status_color)),
        Span::styled(
            status,
            Style::default()
                .fg(status_color)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("  ", Style::default()),
        Span::styled(
            session.mode().as_str().to_string(),
            Style::default().fg(orb_color(session.mode(), session.status.is_online())),
        ),
        Span::styled("  ", Style::default()),
        Span::styled(state.endpoint.clone(), Style::default().fg(Color::DarkGray)),
    ];
    if let Some(command) = &session.last_command {
        spans.push(Span::styled("  › ", Style::default().fg(Color::DarkGray)));
        spans.push(Span::styled(
            truncate_with_ellipsis(command, 32),
            Style::default().fg(Color::Gray),
        ));
    }

    let [left, right] =
        Layout::horizontal([Constraint::Min(0), Constraint::Length(44)]).areas(area);
    frame.render_widget(Paragraph::new(Line::from(spans)), left);

    let hints = [
        InputHint::new("Space", "mic"),
        InputHint::new("/", "ask"),
        InputHint::new("d", "dashboard"),
        InputHint::new("q", "quit"),
    ];
    frame.render_widget(
        Paragraph::new(Line::from(hint_spans(&hints, Color::Cyan))).alignment(Alignment::Right),
        right,
    );
}

#[cfg(test)]
mod tests {
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use ratatui::buffer::Buffer;
    use sayra_core::config::Config;
    use sayra_core::session::InboundEvent;
    use serde_json::json;

    use super::*;
    use crate::overlays::{Overlay, OverlayRequest};

    fn draw(app: &AppState, width: u16, height: u16) -> Buffer {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        terminal.backend().buffer().clone()
    }

    fn contents(buffer: &Buffer) -> String {
        let area = buffer.area;
        let mut out = String::new();
        for y in 0..area.height {
            for x in 0..area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn test_orb_color_by_mode() {
        assert_eq!(orb_color(&AssistantMode::Idle, true), Color::Cyan);
        assert_eq!(orb_color(&AssistantMode::Listening, true), Color::Red);
        assert_eq!(orb_color(&AssistantMode::Processing, true), Color::Magenta);
        assert_eq!(
            orb_color(&AssistantMode::Other("thinking".into()), true),
            Color::Yellow
        );
        assert_eq!(orb_color(&AssistantMode::Listening, false), Color::DarkGray);
    }

    #[test]
    fn test_orb_rect_is_centred() {
        let orb = orb_rect(Rect::new(0, 1, 80, 20));
        assert_eq!(orb, Rect::new(20, 1, 40, 20));

        let narrow = orb_rect(Rect::new(0, 0, 20, 20));
        assert_eq!(narrow, Rect::new(0, 5, 20, 10));
    }

    #[test]
    fn test_pulse_stays_outside_body() {
        for frame in 0..PULSE_STEPS * 2 {
            let radius = pulse_radius(frame);
            assert!(radius > ORB_RINGS[ORB_RINGS.len() - 1]);
            assert!(radius <= 1.0);
        }
    }

    #[test]
    fn test_offline_listening_still_pulses() {
        assert!(orb_pulse(&AssistantMode::Idle, 3).is_none());
        assert_eq!(orb_pulse(&AssistantMode::Listening, 3), Some(pulse_radius(3)));

        let mut app = AppState::new(&Config::default());
        app.tui.session.request_voice_capture();
        assert!(!app.tui.session.status.is_online());

        let still = draw(&app, 80, 24);
        app.tui.spinner_frame = PULSE_STEPS / 2;
        let moved = draw(&app, 80, 24);
        assert_ne!(contents(&still), contents(&moved));

        let orb = app.tui.orb_area.get();
        let lit = (orb.left()..orb.right())
            .flat_map(|x| (orb.top()..orb.bottom()).map(move |y| (x, y)))
            .map(|pos| &moved[pos])
            .filter(|cell| !cell.symbol().trim().is_empty() && cell.symbol() != "\u{2800}")
            .collect::<Vec<_>>();
        assert!(!lit.is_empty());
        assert!(lit.iter().all(|cell| cell.fg == Color::DarkGray));
    }

    #[test]
    fn test_initial_screen() {
        let app = AppState::new(&Config::default());
        let screen = contents(&draw(&app, 80, 24));
        assert!(screen.contains(TOAST_PLACEHOLDER));
        assert!(screen.contains("OFFLINE"));
        assert!(screen.contains("IDLE"));
        assert!(app.tui.orb_area.get().area() > 0);
    }

    #[test]
    fn test_screen_reflects_session() {
        let mut app = AppState::new(&Config::default());
        app.tui.session.apply(&InboundEvent::Connect);
        app.tui
            .session
            .apply(&InboundEvent::from_wire("bot_message", vec![json!("Lights on.")]));
        app.tui.session.apply(&InboundEvent::from_wire(
            "show_alert",
            vec![json!({"type": "warning", "message": "Battery low"})],
        ));
        app.tui.session.request_voice_capture();

        let screen = contents(&draw(&app, 80, 24));
        assert!(screen.contains("ONLINE"));
        assert!(screen.contains("Lights on."));
        assert!(screen.contains("Battery low"));
        assert!(screen.contains("LISTENING …"));
    }

    #[test]
    fn test_dashboard_overlay_renders() {
        let mut app = AppState::new(&Config::default());
        app.tui.session.apply(&InboundEvent::from_wire(
            "system_vitals",
            vec![json!({"cpu": 42, "ram": 60, "battery": 80, "power": "Charging"})],
        ));
        app.overlay = Some(Overlay::open(OverlayRequest::Dashboard));

        let screen = contents(&draw(&app, 100, 30));
        assert!(screen.contains("SAYRA SYSTEMS"));
        assert!(screen.contains("CPU LOAD"));
        assert!(screen.contains("42%"));
        assert!(screen.contains("Retina Guard"));
        assert!(screen.contains("Waiting for input..."));
    }

    #[test]
    fn test_spotlight_overlay_renders_placeholder() {
        let mut app = AppState::new(&Config::default());
        app.overlay = Some(Overlay::open(OverlayRequest::Spotlight));

        let screen = contents(&draw(&app, 100, 30));
        assert!(screen.contains("Ask Sayra or execute command..."));
    }

    #[test]
    fn test_tiny_terminal_does_not_panic() {
        let mut app = AppState::new(&Config::default());
        app.overlay = Some(Overlay::open(OverlayRequest::Dashboard));
        draw(&app, 4, 3);
        app.overlay = Some(Overlay::open(OverlayRequest::Spotlight));
        draw(&app, 4, 3);
    }
}
