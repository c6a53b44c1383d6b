//! TUI reducer (update function).
//!
//! All state mutations happen here. The runtime calls `update(app, event)`
//! and executes the returned effects.

use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::layout::Position;

use crate::effects::UiEffect;
use crate::events::UiEvent;
use crate::overlays::{Overlay, OverlayExt, OverlayRequest, OverlayTransition, OverlayUpdate};
use crate::state::AppState;

/// The main reducer function.
///
/// Takes the current state and an event, mutates state, and returns effects
/// for the runtime to execute.
pub fn update(app: &mut AppState, event: UiEvent) -> Vec<UiEffect> {
    match event {
        UiEvent::Tick => {
            app.tui.spinner_frame = app.tui.spinner_frame.wrapping_add(1);
            vec![]
        }
        UiEvent::Terminal(term_event) => handle_terminal_event(app, term_event),
        UiEvent::Session(session_event) => {
            app.tui.session.apply(&session_event);
            vec![]
        }
    }
}

// ============================================================================
// Terminal Event Handlers
// ============================================================================

fn handle_terminal_event(app: &mut AppState, event: Event) -> Vec<UiEffect> {
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => handle_key(app, key),
        Event::Mouse(mouse) => handle_mouse(app, mouse),
        Event::Paste(text) => {
            if let Some(overlay) = app.overlay.as_mut() {
                overlay.handle_paste(&text);
            }
            vec![]
        }
        // Layout is recomputed on every render.
        _ => vec![],
    }
}

fn handle_key(app: &mut AppState, key: KeyEvent) -> Vec<UiEffect> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('c') {
        return vec![UiEffect::Quit];
    }

    if let Some(overlay) = app.overlay.as_mut() {
        let update = overlay.handle_key(&mut app.tui, key);
        return apply_overlay_update(app, update);
    }

    match key.code {
        KeyCode::Char(' ') | KeyCode::Enter | KeyCode::Char('m') => trigger_mic(app),
        KeyCode::Char('k') if ctrl => open_overlay(app, OverlayRequest::Spotlight),
        KeyCode::Char('/') => open_overlay(app, OverlayRequest::Spotlight),
        KeyCode::Char('d') | KeyCode::Tab => open_overlay(app, OverlayRequest::Dashboard),
        KeyCode::Char('q') | KeyCode::Esc => vec![UiEffect::Quit],
        _ => vec![],
    }
}

fn handle_mouse(app: &mut AppState, mouse: MouseEvent) -> Vec<UiEffect> {
    if let Some(overlay) = app.overlay.as_mut() {
        overlay.handle_mouse(mouse);
        return vec![];
    }

    if mouse.kind == MouseEventKind::Down(MouseButton::Left)
        && app
            .tui
            .orb_area
            .get()
            .contains(Position::new(mouse.column, mouse.row))
    {
        return trigger_mic(app);
    }
    vec![]
}

fn trigger_mic(app: &mut AppState) -> Vec<UiEffect> {
    let event = app.tui.session.request_voice_capture();
    vec![UiEffect::Emit(event)]
}

fn open_overlay(app: &mut AppState, request: OverlayRequest) -> Vec<UiEffect> {
    if !app.overlay.is_open(request) {
        app.overlay = Some(Overlay::open(request));
    }
    vec![]
}

fn apply_overlay_update(app: &mut AppState, update: OverlayUpdate) -> Vec<UiEffect> {
    match update.transition {
        OverlayTransition::Stay => {}
        OverlayTransition::Close => app.overlay = None,
        OverlayTransition::Open(request) => app.overlay = Some(Overlay::open(request)),
    }
    update.effects
}
