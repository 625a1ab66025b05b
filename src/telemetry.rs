//! Tracing subscriber setup.
//!
//! Log lines are handed to a dedicated writer thread through a bounded
//! channel. Producers block when the channel is full instead of dropping
//! lines, and the returned [`WorkerGuard`] flushes whatever is still queued
//! when it is dropped at shutdown.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;

use thiserror::Error;
use tracing_appender::non_blocking::{NonBlockingBuilder, WorkerGuard};
use tracing_subscriber::{EnvFilter, filter::ParseError, fmt};

use crate::config::{LogFormat, LogStream, LoggingConfig};

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log filter '{directive}': {source}")]
    InvalidFilter {
        directive: String,
        #[source]
        source: ParseError,
    },

    #[error("failed to open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to install tracing subscriber: {0}")]
    Install(String),
}

/// Installs the global subscriber. Keep the guard alive until shutdown.
pub fn init(config: &LoggingConfig) -> Result<WorkerGuard, TelemetryError> {
    let filter = build_filter(&config.level)?;
    let sink = open_sink(config)?;

    let (writer, guard) = NonBlockingBuilder::default()
        .buffered_lines_limit(config.buffered_lines.max(1))
        .lossy(false)
        .thread_name("vecrank-log-writer")
        .finish(sink);

    let installed = match config.format {
        LogFormat::Text => fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(config.file.is_none())
            .try_init(),
        LogFormat::Json => fmt()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_env_filter(filter)
            .with_writer(writer)
            .try_init(),
    };
    installed.map_err(|e| TelemetryError::Install(e.to_string()))?;

    Ok(guard)
}

/// `RUST_LOG` when set, otherwise the configured directive.
fn build_filter(level: &str) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level).map_err(|e| TelemetryError::InvalidFilter {
        directive: level.to_string(),
        source: e,
    })
}

fn open_sink(config: &LoggingConfig) -> Result<Box<dyn Write + Send>, TelemetryError> {
    if let Some(path) = &config.file {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| TelemetryError::LogFile {
                path: path.clone(),
                source: e,
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| TelemetryError::LogFile {
                path: path.clone(),
                source: e,
            })?;
        return Ok(Box::new(file));
    }

    Ok(match config.stream {
        LogStream::Stdout => Box::new(io::stdout()),
        LogStream::Stderr => Box::new(io::stderr()),
    })
}
