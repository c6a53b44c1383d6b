//! TUI runtime: owns the terminal, runs the event loop, executes effects.
//!
//! This is the side-effect boundary. The reducer produces `UiEffect`s and
//! this module carries them out against the terminal and the session
//! channel.
//!
//! ## Inbox
//!
//! The session channel is the inbox: its transport task pushes
//! `InboundEvent`s from the tokio runtime, and the loop drains them without
//! blocking each frame, next to crossterm input and the animation tick.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event;
use sayra_core::config::Config;
use sayra_core::interrupt;
use sayra_core::session::SessionChannel;

use crate::effects::UiEffect;
use crate::events::UiEvent;
use crate::state::AppState;
use crate::terminal::{self, OrbTerminal};
use crate::{render, update};

/// Full-screen orb runtime.
///
/// Borrows the channel for its lifetime; the caller closes it afterwards.
pub struct TuiRuntime<'a> {
    terminal: OrbTerminal,
    pub state: AppState,
    channel: &'a mut SessionChannel,
    tick_interval: Duration,
    last_tick: Instant,
}

impl<'a> TuiRuntime<'a> {
    /// Takes over the terminal.
    ///
    /// # Errors
    /// Returns an error if the terminal cannot be set up.
    pub fn new(config: &Config, channel: &'a mut SessionChannel) -> Result<Self> {
        terminal::install_panic_hook();
        interrupt::set_restore_hook(|| {
            let _ = terminal::restore_terminal();
        });
        interrupt::reset();

        let terminal = terminal::setup_terminal().context("Failed to setup terminal")?;
        let mut state = AppState::new(config);
        state.tui.endpoint = channel.endpoint().to_string();

        Ok(Self {
            terminal,
            state,
            channel,
            tick_interval: config.ui.tick_interval(),
            last_tick: Instant::now(),
        })
    }

    /// Runs until the user quits or an interrupt arrives.
    ///
    /// # Errors
    /// Returns `InterruptedError` on a signal, or an error if terminal input
    /// or drawing fails.
    pub fn run(&mut self) -> Result<()> {
        let mut dirty = true;

        while !self.state.tui.should_quit {
            if interrupt::is_interrupted() {
                tracing::info!("Interrupted, leaving the orb");
                return Err(interrupt::InterruptedError.into());
            }

            let events = self.collect_events()?;
            for event in events {
                dirty = true;
                let effects = update::update(&mut self.state, event);
                self.execute_effects(effects);
            }

            if dirty {
                self.terminal
                    .draw(|frame| render::render(&self.state, frame))
                    .context("Failed to draw frame")?;
                dirty = false;
            }
        }

        Ok(())
    }

    // ========================================================================
    // Event Collection
    // ========================================================================

    fn collect_events(&mut self) -> Result<Vec<UiEvent>> {
        let mut events = Vec::new();

        while let Some(inbound) = self.channel.try_recv() {
            events.push(UiEvent::Session(inbound));
        }

        // Block for input only when nothing is queued, and never past the
        // next tick.
        let poll_duration = if events.is_empty() {
            self.tick_interval.saturating_sub(self.last_tick.elapsed())
        } else {
            Duration::ZERO
        };

        if event::poll(poll_duration)? {
            events.push(UiEvent::Terminal(event::read()?));
            while event::poll(Duration::ZERO)? {
                events.push(UiEvent::Terminal(event::read()?));
            }
        }

        if self.last_tick.elapsed() >= self.tick_interval {
            events.push(UiEvent::Tick);
            self.last_tick = Instant::now();
        }

        Ok(events)
    }

    // ========================================================================
    // Effect Dispatch
    // ========================================================================

    fn execute_effects(&mut self, effects: Vec<UiEffect>) {
        for effect in effects {
            match effect {
                UiEffect::Quit => self.state.tui.should_quit = true,
                UiEffect::Emit(event) => {
                    tracing::debug!(event = event.name(), "Emitting");
                    self.channel.emit(event);
                }
            }
        }
    }
}

impl Drop for TuiRuntime<'_> {
    fn drop(&mut self) {
        let _ = terminal::restore_terminal();
    }
}
