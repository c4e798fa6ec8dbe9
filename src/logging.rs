//! Tracing setup. The terminal belongs to the TUI, so events go to a daily
//! rolling file under the cache directory.

use std::path::Path;

use color_eyre::eyre::eyre;
use color_eyre::Result;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Environment variable that overrides the configured filter
pub const LOG_ENV: &str = "CRIMEBOARD_LOG";

const LOG_FILE_PREFIX: &str = "crimeboard.log";

/// Filter directive: `CRIMEBOARD_LOG` wins, then `--debug`, then config.
pub fn filter_directive(config: &LoggingConfig, debug: bool, env_value: Option<&str>) -> String {
    if let Some(value) = env_value.map(str::trim).filter(|v| !v.is_empty()) {
        return value.to_string();
    }
    if debug {
        return "debug".to_string();
    }
    config.level.to_lowercase()
}

/// Background writer into the daily rolling file. Lines reach disk once the
/// guard is dropped at the latest.
pub fn file_writer(log_dir: &Path) -> Result<(NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(log_dir)?;
    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    Ok(tracing_appender::non_blocking(file_appender))
}

/// Install the global subscriber. Keep the returned guard alive until exit or
/// buffered lines are lost. Returns `None` when file logging is disabled.
pub fn init_tracing(
    config: &LoggingConfig,
    debug: bool,
    log_dir: &Path,
) -> Result<Option<WorkerGuard>> {
    if !config.file && !debug {
        return Ok(None);
    }

    let env_value = std::env::var(LOG_ENV).ok();
    let directive = filter_directive(config, debug, env_value.as_deref());
    let filter = EnvFilter::try_new(&directive)
        .map_err(|e| eyre!("Invalid log filter '{}': {}", directive, e))?;

    let (non_blocking, guard) = file_writer(log_dir)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(true)
        .with_writer(non_blocking)
        .try_init()
        .map_err(|e| eyre!("Could not install log subscriber: {}", e))?;

    Ok(Some(guard))
}
