//! Logging setup for the CLI, grounded on the teacher's `telemetry::init`/
//! `LogFormat` pattern minus the OpenTelemetry tracing pipeline and
//! Prometheus exporter: `kuke` runs once per invocation and exits, so there
//! is no longstanding process to export spans or scrape metrics from
//! (`SPEC_FULL.md` §4.12).

use thiserror::Error;
use tracing_subscriber::{prelude::*, EnvFilter, Registry};

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to install global tracing subscriber: {0}")]
    SetGlobalDefault(#[from] tracing::dispatcher::SetGlobalDefaultError),
}

/// Output format for log lines, selected with `--log-format`.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Installs a process-global `tracing` subscriber. `log_filter` is an
/// `EnvFilter` directive string, e.g. `"info,kukeon_core=debug"`.
pub fn init(log_filter: &str, log_format: LogFormat) -> Result<(), Error> {
    let logger = match log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().compact().boxed(),
        LogFormat::Text => tracing_subscriber::fmt::layer().compact().boxed(),
    };
    let filter = EnvFilter::new(log_filter);
    let collector = Registry::default().with(logger).with(filter);
    tracing::subscriber::set_global_default(collector)?;
    Ok(())
}
