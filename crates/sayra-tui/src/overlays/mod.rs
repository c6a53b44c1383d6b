//! Overlay modules for the TUI.
//!
//! Overlays are modal components that take over keyboard input while open.
//! Each one owns its state, key handler and render function. At most one
//! overlay is open at a time.
//!
//! ## Module Structure
//!
//! - `dashboard.rs`: vitals, protocols and the live feed (`d` / `Tab`)
//! - `spotlight.rs`: command prompt (`/` / `Ctrl+K`)
//! - `render_utils.rs`: shared rendering helpers

pub mod dashboard;
pub mod render_utils;
pub mod spotlight;

use crossterm::event::{KeyEvent, MouseEvent};
pub use dashboard::DashboardState;
use ratatui::Frame;
use ratatui::layout::Rect;
pub use spotlight::SpotlightState;

use crate::effects::UiEffect;
use crate::state::TuiState;

// ============================================================================
// OverlayRequest / OverlayTransition / OverlayUpdate
// ============================================================================

/// Requests to open a new overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayRequest {
    Dashboard,
    Spotlight,
}

/// Transition returned by overlay key handlers.
#[derive(Debug, PartialEq, Eq)]
pub enum OverlayTransition {
    Stay,
    Close,
    Open(OverlayRequest),
}

/// Update returned by overlay key handlers.
#[derive(Debug)]
pub struct OverlayUpdate {
    pub transition: OverlayTransition,
    pub effects: Vec<UiEffect>,
}

impl OverlayUpdate {
    fn new(transition: OverlayTransition) -> Self {
        Self {
            transition,
            effects: Vec::new(),
        }
    }

    pub fn stay() -> Self {
        Self::new(OverlayTransition::Stay)
    }

    pub fn close() -> Self {
        Self::new(OverlayTransition::Close)
    }

    pub fn open(request: OverlayRequest) -> Self {
        Self::new(OverlayTransition::Open(request))
    }

    #[must_use]
    pub fn with_ui_effects(mut self, effects: Vec<UiEffect>) -> Self {
        self.effects = effects;
        self
    }
}

// ============================================================================
// Overlay
// ============================================================================

#[derive(Debug)]
pub enum Overlay {
    Dashboard(DashboardState),
    Spotlight(SpotlightState),
}

impl Overlay {
    pub fn open(request: OverlayRequest) -> Self {
        match request {
            OverlayRequest::Dashboard => Overlay::Dashboard(DashboardState::default()),
            OverlayRequest::Spotlight => Overlay::Spotlight(SpotlightState::default()),
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, tui: &TuiState) {
        match self {
            Overlay::Dashboard(d) => d.render(frame, area, &tui.session),
            Overlay::Spotlight(s) => s.render(frame, area),
        }
    }

    pub fn handle_key(&mut self, tui: &mut TuiState, key: KeyEvent) -> OverlayUpdate {
        match self {
            Overlay::Dashboard(d) => d.handle_key(tui, key),
            Overlay::Spotlight(s) => s.handle_key(tui, key),
        }
    }

    pub fn handle_paste(&mut self, text: &str) {
        if let Overlay::Spotlight(s) = self {
            s.handle_paste(text);
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        if let Overlay::Dashboard(d) = self {
            d.handle_mouse(mouse);
        }
    }

    pub fn request(&self) -> OverlayRequest {
        match self {
            Overlay::Dashboard(_) => OverlayRequest::Dashboard,
            Overlay::Spotlight(_) => OverlayRequest::Spotlight,
        }
    }
}

// ============================================================================
// OverlayExt - Extension trait for Option<Overlay>
// ============================================================================

/// Extension trait for `Option<Overlay>` providing convenience helpers.
pub trait OverlayExt {
    /// Renders the overlay if one is active.
    fn render(&self, frame: &mut Frame, area: Rect, tui: &TuiState);

    /// Whether the open overlay (if any) was opened by `request`.
    fn is_open(&self, request: OverlayRequest) -> bool;
}

impl OverlayExt for Option<Overlay> {
    fn render(&self, frame: &mut Frame, area: Rect, tui: &TuiState) {
        if let Some(overlay) = self {
            overlay.render(frame, area, tui);
        }
    }

    fn is_open(&self, request: OverlayRequest) -> bool {
        self.as_ref().is_some_and(|o| o.request() == request)
    }
}
