//! UI events fed to the reducer.

use crossterm::event::Event;
use sayra_core::session::InboundEvent;

/// Everything that can change the UI state.
#[derive(Debug, Clone)]
pub enum UiEvent {
    /// Animation tick.
    Tick,
    /// Keyboard, mouse, paste or resize input.
    Terminal(Event),
    /// Event from the session channel.
    Session(InboundEvent),
}
