// src/logging.rs

//! Logging setup for `basis` and `basis-gen` using `tracing` +
//! `tracing-subscriber`.
//!
//! Filter priority:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `BASIS_LOG` environment variable, in `EnvFilter` directive syntax
//!    (`debug`, `basis::watch=trace,info`, ...)
//! 3. [`DEFAULT_DIRECTIVES`]
//!
//! Logs are sent to STDERR so that stdout carries only command output
//! (`basis config`, build summaries).

use anyhow::Result;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "BASIS_LOG";

/// `info` for basis, with the watcher and glob crates kept quiet.
pub const DEFAULT_DIRECTIVES: &str = "info,notify=warn,globset=warn";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV_VAR).ok();
    let directives = filter_directives(cli_level, env.as_deref());

    fmt()
        .with_env_filter(EnvFilter::try_new(&directives)?)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    if cli_level.is_none() {
        if let Some(raw) = env.filter(|raw| !raw.trim().is_empty() && directives != raw.trim()) {
            warn!("ignoring invalid {LOG_ENV_VAR} value '{raw}'");
        }
    }
    Ok(())
}

/// Directives for the subscriber's `EnvFilter`. An unparsable `env` value
/// falls back to the defaults.
pub fn filter_directives(cli_level: Option<LogLevel>, env: Option<&str>) -> String {
    if let Some(level) = cli_level {
        return level_name(level).to_string();
    }
    match env.map(str::trim).filter(|s| !s.is_empty()) {
        Some(directives) if EnvFilter::try_new(directives).is_ok() => directives.to_string(),
        _ => DEFAULT_DIRECTIVES.to_string(),
    }
}

fn level_name(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
