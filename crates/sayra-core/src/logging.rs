//! Tracing subscriber setup.
//!
//! The TUI owns stdout/stderr, so logs always go to a daily rolling file
//! under `${SAYRA_HOME}/logs`. The filter comes from `SAYRA_LOG` when set,
//! otherwise from `logging.level` in the config.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_ENV: &str = "SAYRA_LOG";

/// File name prefix for rolling log files.
pub const LOG_FILE_PREFIX: &str = "sayra.log";

/// Installs the global subscriber writing to `dir`.
///
/// Keep the returned guard alive for the lifetime of the process; dropping
/// it flushes and stops the background writer.
///
/// # Errors
/// Returns an error if the log directory cannot be created or a global
/// subscriber is already installed.
pub fn init(dir: &Path, default_level: &str) -> Result<WorkerGuard> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = build_filter(std::env::var(LOG_ENV).ok().as_deref(), default_level);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {e}"))?;

    Ok(guard)
}

/// Builds the filter, preferring the env directive over the config level.
///
/// Invalid directives fall through to the next source, ending at `info`.
fn build_filter(env_directive: Option<&str>, default_level: &str) -> EnvFilter {
    env_directive
        .and_then(|d| EnvFilter::try_new(d).ok())
        .or_else(|| EnvFilter::try_new(default_level).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::filter::LevelFilter;

    use super::*;

    #[test]
    fn test_env_directive_wins() {
        let filter = build_filter(Some("debug"), "warn");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn test_config_level_used_without_env() {
        let filter = build_filter(None, "warn");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn test_invalid_directives_fall_back_to_info() {
        let filter = build_filter(Some("sayra=notalevel"), "tui=alsobad");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    }
}
