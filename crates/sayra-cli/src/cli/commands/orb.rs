//! Default command: connect to the backend and run the orb.

use anyhow::Result;
use sayra_core::config::{Config, paths};
use sayra_core::logging;
use sayra_core::session::SessionChannel;
use tokio::runtime::Runtime;

pub fn run(config: &Config, rt: &Runtime) -> Result<()> {
    let _log_guard = logging::init(&paths::logs_dir(), &config.logging.level)?;
    tracing::info!(endpoint = %config.session.endpoint, "Starting orb");

    // The transport task is spawned onto `rt`; the UI loop stays on this
    // thread.
    let mut channel = {
        let _enter = rt.enter();
        SessionChannel::connect(&config.session)
    };

    let result = sayra_tui::run_orb(config, &mut channel);
    rt.block_on(channel.close());
    tracing::info!("Orb closed");
    result
}

