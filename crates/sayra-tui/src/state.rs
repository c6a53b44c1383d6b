//! Application state composition.
//!
//! ```text
//! AppState
//! ├── tui: TuiState
//! │   ├── session: SessionState   (slots pushed by the backend)
//! │   ├── endpoint                (shown in the status line)
//! │   ├── spinner_frame           (orb animation)
//! │   └── orb_area                (set during render, used for clicks)
//! └── overlay: Option<Overlay>    (dashboard or spotlight)
//! ```
//!
//! Overlays are kept apart from `TuiState` so an overlay handler can hold
//! `&mut self` and `&TuiState` at the same time.

use std::cell::Cell;

use ratatui::layout::Rect;
use sayra_core::config::Config;
use sayra_core::session::SessionState;

use crate::overlays::Overlay;

/// Combined application state for the TUI.
pub struct AppState {
    pub tui: TuiState,
    pub overlay: Option<Overlay>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            tui: TuiState::new(config),
            overlay: None,
        }
    }
}

/// Non-overlay UI state.
pub struct TuiState {
    /// Flag indicating the app should quit.
    pub should_quit: bool,
    pub session: SessionState,
    pub endpoint: String,
    /// Animation frame counter, advanced on every tick.
    pub spinner_frame: usize,
    pub orb_area: Cell<Rect>,
}

impl TuiState {
    pub fn new(config: &Config) -> Self {
        Self {
            should_quit: false,
            session: SessionState::new(config.ui.log_capacity),
            endpoint: config.session.endpoint.clone(),
            spinner_frame: 0,
            orb_area: Cell::new(Rect::default()),
        }
    }
}
