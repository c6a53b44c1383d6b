//! Dashboard overlay: vitals, protocol status and the live conversation feed.
//!
//! The feed follows the newest entry until the user scrolls up; `End` (or
//! scrolling back to the bottom) resumes following.

use std::cell::{Cell, RefCell};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph};
use sayra_core::session::{ConversationLog, LogOrigin, SessionState, VitalsSnapshot};

use super::render_utils::{InputHint, inner_rect, render_hints, render_overlay_container};
use super::{OverlayRequest, OverlayUpdate};
use crate::common::Scrollbar;
use crate::common::text::wrap_text;
use crate::effects::UiEffect;
use crate::state::TuiState;

pub const EMPTY_FEED: &str = "Waiting for input...";

/// Lines moved per mouse wheel step.
const WHEEL_LINES: usize = 3;

/// Fixed protocol indicators: (label, active).
const PROTOCOLS: [(&str, bool); 3] = [
    ("Retina Guard", true),
    ("Sentry Mode", false),
    ("Circadian", true),
];

/// Where the feed viewport sits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FeedScroll {
    /// Pinned to the newest entry.
    #[default]
    FollowLatest,
    /// Fixed line offset from the top.
    Anchored { offset: usize },
}

/// Feed size as of the last render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedMetrics {
    pub total_lines: usize,
    pub viewport: usize,
}

impl FeedMetrics {
    fn max_offset(self) -> usize {
        self.total_lines.saturating_sub(self.viewport)
    }
}

/// Wrapped feed lines, keyed by entries pushed so far and text width.
#[derive(Debug, Default)]
struct FeedCache {
    key: Option<(u64, usize)>,
    lines: Vec<Line<'static>>,
}

#[derive(Debug, Default)]
pub struct DashboardState {
    pub scroll: FeedScroll,
    /// Written during render, read when handling scroll input.
    pub metrics: Cell<FeedMetrics>,
    cache: RefCell<FeedCache>,
}

impl DashboardState {
    /// Effective top line for the current metrics.
    pub fn offset(&self) -> usize {
        let max = self.metrics.get().max_offset();
        match self.scroll {
            FeedScroll::FollowLatest => max,
            FeedScroll::Anchored { offset } => offset.min(max),
        }
    }

    pub fn scroll_up(&mut self, lines: usize) {
        let offset = self.offset().saturating_sub(lines);
        self.scroll = FeedScroll::Anchored { offset };
    }

    pub fn scroll_down(&mut self, lines: usize) {
        if let FeedScroll::Anchored { offset } = self.scroll {
            let next = offset.saturating_add(lines);
            self.scroll = if next >= self.metrics.get().max_offset() {
                FeedScroll::FollowLatest
            } else {
                FeedScroll::Anchored { offset: next }
            };
        }
    }

    pub fn follow_latest(&mut self) {
        self.scroll = FeedScroll::FollowLatest;
    }

    fn page(&self) -> usize {
        self.metrics.get().viewport.saturating_sub(1).max(1)
    }

    pub fn handle_key(&mut self, tui: &mut TuiState, key: KeyEvent) -> OverlayUpdate {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Esc | KeyCode::Tab | KeyCode::Char('d') => OverlayUpdate::close(),
            KeyCode::Char('/') => OverlayUpdate::open(OverlayRequest::Spotlight),
            KeyCode::Char('k') if ctrl => OverlayUpdate::open(OverlayRequest::Spotlight),
            KeyCode::Char('m') => {
                let event = tui.session.request_voice_capture();
                OverlayUpdate::stay().with_ui_effects(vec![UiEffect::Emit(event)])
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.scroll_up(1);
                OverlayUpdate::stay()
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.scroll_down(1);
                OverlayUpdate::stay()
            }
            KeyCode::PageUp => {
                self.scroll_up(self.page());
                OverlayUpdate::stay()
            }
            KeyCode::PageDown => {
                self.scroll_down(self.page());
                OverlayUpdate::stay()
            }
            KeyCode::Home => {
                self.scroll = FeedScroll::Anchored { offset: 0 };
                OverlayUpdate::stay()
            }
            KeyCode::End => {
                self.follow_latest();
                OverlayUpdate::stay()
            }
            _ => OverlayUpdate::stay(),
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::ScrollUp => self.scroll_up(WHEEL_LINES),
            MouseEventKind::ScrollDown => self.scroll_down(WHEEL_LINES),
            _ => {}
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, session: &SessionState) {
        let popup = Rect::new(
            area.x + 1,
            area.y,
            area.width.saturating_sub(2),
            area.height,
        );
        render_overlay_container(frame, popup, "SAYRA SYSTEMS", Color::Cyan);

        let mode = mode_header(session);
        let mode_area = Rect::new(popup.x + 1, popup.y, popup.width.saturating_sub(2), 1);
        frame.render_widget(
            Paragraph::new(Span::styled(mode, Style::default().fg(Color::Gray)))
                .alignment(Alignment::Right),
            mode_area,
        );

        let inner = inner_rect(popup);
        let [body, footer] =
            Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(inner);
        let [left, right] =
            Layout::horizontal([Constraint::Ratio(1, 3), Constraint::Ratio(2, 3)]).areas(body);

        render_vitals(frame, left, session);
        self.render_feed(frame, right, &session.log);

        let hints = [
            InputHint::new("↑↓", "scroll"),
            InputHint::new("End", "follow"),
            InputHint::new("/", "ask"),
            InputHint::new("m", "mic"),
            InputHint::new("Esc", "close"),
        ];
        render_hints(frame, footer, &hints, Color::Cyan);
    }

    fn render_feed(&self, frame: &mut Frame, area: Rect, log: &ConversationLog) {
        let mut block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                " LIVE FEED ",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ));
        if let Some(counter) = feed_counter(log) {
            block = block.title(
                Line::from(Span::styled(counter, Style::default().fg(Color::DarkGray)))
                    .right_aligned(),
            );
        }
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if log.is_empty() {
            self.metrics.set(FeedMetrics::default());
            frame.render_widget(
                Paragraph::new(Span::styled(
                    EMPTY_FEED,
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::ITALIC),
                )),
                inner,
            );
            return;
        }

        let text_width = inner.width.saturating_sub(2) as usize;
        let viewport = inner.height as usize;
        let mut cache = self.cache.borrow_mut();
        let key = (log.evicted() + log.len() as u64, text_width);
        if cache.key != Some(key) {
            cache.lines = feed_lines(log, text_width);
            cache.key = Some(key);
        }
        let total_lines = cache.lines.len();
        self.metrics.set(FeedMetrics {
            total_lines,
            viewport,
        });
        let offset = self.offset();

        // Only the visible window is handed to the paragraph.
        let end = offset.saturating_add(viewport).min(total_lines);
        let visible = cache.lines[offset..end].to_vec();
        let text_area = Rect::new(inner.x, inner.y, inner.width.saturating_sub(1), inner.height);
        frame.render_widget(Paragraph::new(visible), text_area);
        frame.render_widget(
            Scrollbar::new(total_lines, viewport, offset).thumb_color(Color::Gray),
            inner,
        );
    }
}

/// Header text; a pending intent also shows the last confirmed mode.
fn mode_header(session: &SessionState) -> String {
    let current = session.mode().as_str().to_uppercase();
    if session.mode.is_pending() {
        let confirmed = session.mode.confirmed().as_str().to_uppercase();
        format!(" MODE: {current} (CONFIRMED: {confirmed}) ")
    } else {
        format!(" MODE: {current} ")
    }
}

/// Right-hand feed title: fill level of a bounded log and how many entries
/// it already dropped. Unbounded logs show nothing.
fn feed_counter(log: &ConversationLog) -> Option<String> {
    let capacity = log.capacity();
    if capacity == 0 {
        return None;
    }
    let fill = format!("{}/{capacity}", log.len());
    Some(match log.evicted() {
        0 => format!(" {fill} "),
        evicted => format!(" +{evicted} earlier · {fill} "),
    })
}

/// Lays out the log: user entries on the right, assistant on the left,
/// each followed by its time and separated by a blank line.
pub fn feed_lines(log: &ConversationLog, width: usize) -> Vec<Line<'static>> {
    let bubble_width = (width * 9 / 10).max(1);
    let mut lines = Vec::new();

    for (i, entry) in log.iter().enumerate() {
        if i > 0 {
            lines.push(Line::default());
        }
        let (style, alignment) = match entry.origin {
            LogOrigin::User => (Style::default().fg(Color::Cyan), Alignment::Right),
            LogOrigin::Assistant => (Style::default().fg(Color::Gray), Alignment::Left),
        };
        for text in wrap_text(&entry.text, bubble_width) {
            lines.push(Line::from(Span::styled(text, style)).alignment(alignment));
        }
        lines.push(
            Line::from(Span::styled(
                entry.timestamp.clone(),
                Style::default().fg(Color::DarkGray),
            ))
            .alignment(alignment),
        );
    }

    lines
}

fn render_vitals(frame: &mut Frame, area: Rect, session: &SessionState) {
    let vitals = &session.vitals;
    let [cpu, ram, battery, protocols] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Min(0),
    ])
    .areas(area);

    render_card(frame, cpu, "CPU LOAD", vitals.cpu, Color::Yellow);
    render_card(frame, ram, "MEMORY", vitals.ram, Color::Magenta);
    let battery_label = if vitals.power.is_empty() {
        "BATTERY".to_string()
    } else {
        format!("BATTERY · {}", vitals.power)
    };
    render_card(
        frame,
        battery,
        &battery_label,
        vitals.battery,
        battery_color(vitals),
    );

    render_protocols(frame, protocols, session);
}

fn battery_color(vitals: &VitalsSnapshot) -> Color {
    if vitals.is_charging() {
        Color::Green
    } else {
        Color::Blue
    }
}

fn render_card(frame: &mut Frame, area: Rect, label: &str, value: f64, color: Color) {
    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(Span::styled(
                    format!(" {label} "),
                    Style::default().fg(Color::Gray),
                )),
        )
        .gauge_style(Style::default().fg(color))
        .ratio(gauge_ratio(value))
        .label(Span::styled(
            format!("{value:.0}%"),
            Style::default().add_modifier(Modifier::BOLD),
        ));
    frame.render_widget(gauge, area);
}

/// Percentage to a gauge ratio in `0.0..=1.0`.
fn gauge_ratio(value: f64) -> f64 {
    if value.is_finite() {
        (value / 100.0).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn render_protocols(frame: &mut Frame, area: Rect, session: &SessionState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " ACTIVE PROTOCOLS ",
            Style::default().fg(Color::Gray),
        ));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines: Vec<Line> = PROTOCOLS
        .iter()
        .map(|(label, active)| {
            let (dot, color) = if *active {
                ("●", Color::Green)
            } else {
                ("●", Color::Red)
            };
            Line::from(vec![
                Span::styled(format!("{label:<14}"), Style::default().fg(Color::Gray)),
                Span::styled(dot, Style::default().fg(color)),
            ])
        })
        .collect();

    lines.push(Line::default());
    lines.push(status_line("Presence", session.presence.as_str()));
    lines.push(status_line("Backend", session.backend.as_str()));

    frame.render_widget(Paragraph::new(lines), inner);
}

fn status_line(label: &str, value: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label:<14}"), Style::default().fg(Color::DarkGray)),
        Span::styled(value.to_string(), Style::default().fg(Color::Gray)),
    ])
}

#[cfg(test)]
mod tests {
    use chrono::Local;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use sayra_core::session::{AssistantMode, InboundEvent, LogEntry};

    use super::*;

    fn draw(dashboard: &DashboardState, session: &SessionState, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal
            .draw(|frame| {
                let area = frame.area();
                dashboard.render(frame, area, session);
            })
            .unwrap();
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

    fn dashboard_with(total_lines: usize, viewport: usize) -> DashboardState {
        let state = DashboardState::default();
        state.metrics.set(FeedMetrics {
            total_lines,
            viewport,
        });
        state
    }

    #[test]
    fn test_follows_latest_by_default() {
        let state = dashboard_with(50, 10);
        assert_eq!(state.scroll, FeedScroll::FollowLatest);
        assert_eq!(state.offset(), 40);
    }

    #[test]
    fn test_scroll_up_anchors_and_end_resumes() {
        let mut state = dashboard_with(50, 10);
        state.scroll_up(5);
        assert_eq!(state.scroll, FeedScroll::Anchored { offset: 35 });

        // New content does not move an anchored view.
        state.metrics.set(FeedMetrics {
            total_lines: 60,
            viewport: 10,
        });
        assert_eq!(state.offset(), 35);

        state.follow_latest();
        assert_eq!(state.offset(), 50);
    }

    #[test]
    fn test_scroll_down_to_bottom_resumes_following() {
        let mut state = dashboard_with(50, 10);
        state.scroll_up(3);
        state.scroll_down(2);
        assert_eq!(state.scroll, FeedScroll::Anchored { offset: 39 });
        state.scroll_down(5);
        assert_eq!(state.scroll, FeedScroll::FollowLatest);
    }

    #[test]
    fn test_scroll_up_stops_at_top() {
        let mut state = dashboard_with(12, 10);
        state.scroll_up(100);
        assert_eq!(state.offset(), 0);
    }

    #[test]
    fn test_feed_lines_layout() {
        let mut log = ConversationLog::new(0);
        let now = Local::now();
        log.push(LogEntry::new(LogOrigin::User, "turn on lights", now));
        log.push(LogEntry::new(LogOrigin::Assistant, "Lights on.", now));

        let lines = feed_lines(&log, 40);
        // text + time, blank, text + time
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0].alignment, Some(Alignment::Right));
        assert_eq!(lines[3].alignment, Some(Alignment::Left));
        assert_eq!(lines[3].to_string(), "Lights on.");
        assert!(lines[2].spans.is_empty());
    }

    #[test]
    fn test_long_unbounded_feed_shows_newest_entry() {
        let mut session = SessionState::new(0);
        let now = Local::now();
        for i in 0..=30_000 {
            session
                .log
                .push(LogEntry::new(LogOrigin::Assistant, format!("msg{i}"), now));
        }
        let dashboard = DashboardState::default();

        let screen = draw(&dashboard, &session, 100, 30);
        assert!(dashboard.metrics.get().total_lines > usize::from(u16::MAX));
        assert!(screen.contains("msg30000"), "{screen}");
        assert!(!screen.contains("msg29990"));

        // Same log and width: the wrapped lines are reused.
        let cached = dashboard.cache.borrow().key;
        draw(&dashboard, &session, 100, 30);
        assert_eq!(dashboard.cache.borrow().key, cached);

        session
            .log
            .push(LogEntry::new(LogOrigin::User, "one more", now));
        let screen = draw(&dashboard, &session, 100, 30);
        assert!(screen.contains("one more"));
        assert_ne!(dashboard.cache.borrow().key, cached);
    }

    #[test]
    fn test_anchored_view_renders_its_window() {
        let mut session = SessionState::new(0);
        let now = Local::now();
        for i in 0..100 {
            session
                .log
                .push(LogEntry::new(LogOrigin::Assistant, format!("entry-{i}-"), now));
        }
        let mut dashboard = DashboardState::default();
        draw(&dashboard, &session, 100, 30);
        dashboard.scroll = FeedScroll::Anchored { offset: 0 };

        let screen = draw(&dashboard, &session, 100, 30);
        assert!(screen.contains("entry-0-"));
        assert!(!screen.contains("entry-99-"));
    }

    #[test]
    fn test_mode_header_shows_confirmed_mode_while_pending() {
        let mut session = SessionState::new(0);
        assert_eq!(mode_header(&session), " MODE: IDLE ");

        let _ = session.request_voice_capture();
        assert_eq!(
            mode_header(&session),
            " MODE: LISTENING (CONFIRMED: IDLE) "
        );

        session.apply(&InboundEvent::SayraState(AssistantMode::Processing));
        assert_eq!(mode_header(&session), " MODE: PROCESSING ");
    }

    #[test]
    fn test_feed_counter_reports_fill_and_evictions() {
        let now = Local::now();
        let mut unbounded = ConversationLog::new(0);
        unbounded.push(LogEntry::new(LogOrigin::User, "hi", now));
        assert_eq!(feed_counter(&unbounded), None);

        let mut bounded = ConversationLog::new(2);
        assert_eq!(feed_counter(&bounded).as_deref(), Some(" 0/2 "));
        for text in ["a", "b", "c"] {
            bounded.push(LogEntry::new(LogOrigin::User, text, now));
        }
        assert_eq!(
            feed_counter(&bounded).as_deref(),
            Some(" +1 earlier · 2/2 ")
        );
    }

    #[test]
    fn test_gauge_ratio_is_clamped() {
        assert!((gauge_ratio(42.0) - 0.42).abs() < f64::EPSILON);
        assert!((gauge_ratio(250.0) - 1.0).abs() < f64::EPSILON);
        assert!(gauge_ratio(-3.0).abs() < f64::EPSILON);
        assert!(gauge_ratio(f64::NAN).abs() < f64::EPSILON);
    }

    #[test]
    fn test_battery_color_tracks_power() {
        let charging = VitalsSnapshot {
            power: "Charging".to_string(),
            ..VitalsSnapshot::default()
        };
        assert_eq!(battery_color(&charging), Color::Green);
        assert_eq!(battery_color(&VitalsSnapshot::default()), Color::Blue);
    }
}
