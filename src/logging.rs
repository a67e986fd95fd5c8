// src/logging.rs

//! Logging setup for `loopflow` using `tracing` + `tracing-subscriber`.
//!
//! Filter selection:
//! 1. `--log-level` CLI flag, applied to every target
//! 2. `LOOPFLOW_LOG`, in `EnvFilter` syntax, so one module can be traced on
//!    its own (e.g. `info,loopflow::propagator=trace`)
//! 3. `info`
//!
//! Logs go to STDERR; fetched values are printed on stdout. Thread ids are
//! included because nodes of one frame run on several workers.

use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

const DEFAULT_DIRECTIVES: &str = "info";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var("LOOPFLOW_LOG").ok();
    let filter = build_filter(cli_level, env.as_deref());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to install log subscriber: {e}"))?;

    if let (None, Some(raw)) = (cli_level, env.as_deref()) {
        if EnvFilter::try_new(raw.trim()).is_err() {
            tracing::warn!(value = raw, "ignoring unparsable LOOPFLOW_LOG");
        }
    }

    Ok(())
}

/// Resolve the subscriber filter from the CLI flag and the raw
/// `LOOPFLOW_LOG` value. An unparsable value falls back to `info`.
pub fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> EnvFilter {
    if let Some(lvl) = cli_level {
        return EnvFilter::new(directive_for(lvl));
    }
    env.map(str::trim)
        .filter(|raw| !raw.is_empty())
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
}

fn directive_for(lvl: LogLevel) -> &'static str {
    match lvl {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
