//! Full-screen orb interface for Sayra.

pub mod common;
pub mod effects;
pub mod events;
pub mod overlays;
pub mod render;
pub mod runtime;
pub mod state;
pub mod terminal;
pub mod update;

use std::io::{IsTerminal, stdout};

use anyhow::Result;
pub use runtime::TuiRuntime;
use sayra_core::config::Config;
use sayra_core::session::SessionChannel;

/// Runs the orb until the user quits.
///
/// The channel must already be connecting; it stays open afterwards so the
/// caller can close it cleanly.
///
/// # Errors
/// Returns an error when stdout is not a terminal, when the terminal fails,
/// or `InterruptedError` on a signal.
pub fn run_orb(config: &Config, channel: &mut SessionChannel) -> Result<()> {
    if !stdout().is_terminal() {
        anyhow::bail!(
            "The orb needs an interactive terminal.\n\
             Use `sayra config show` to inspect settings without one."
        );
    }

    let mut runtime = TuiRuntime::new(config, channel)?;
    runtime.run()
}
