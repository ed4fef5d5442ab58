//! Tracing subscriber setup for the `declmap` binary.
//!
//! Events always go to stderr. When a log directory is configured they are
//! also written to daily-rotated files through a non-blocking writer.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LogConfig;

/// Environment variable holding a filter that beats the configured level.
pub const LOG_ENV: &str = "DECLMAP_LOG";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter '{directive}': {source}")]
    Filter {
        directive: String,
        #[source]
        source: ParseError,
    },

    #[error("failed to create log directory {path}")]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to open log file in {path}: {source}")]
    Appender {
        path: PathBuf,
        #[source]
        source: InitError,
    },

    #[error("failed to initialize tracing subscriber: {0}")]
    Init(#[from] TryInitError),
}

/// Flushes the file writer when dropped. Hold it for the life of `main`.
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Level forced by `--quiet` / `--verbose`, if any.
pub fn verbosity_override(quiet: bool, verbose: bool) -> Option<&'static str> {
    if quiet {
        Some("error")
    } else if verbose {
        Some("debug")
    } else {
        None
    }
}

fn parse_filter(directive: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(directive).map_err(|source| LoggingError::Filter {
        directive: directive.to_string(),
        source,
    })
}

/// Resolve the active filter: explicit override, then `DECLMAP_LOG`, then config.
///
/// A set but malformed `DECLMAP_LOG` is an error rather than a silent fallback.
fn resolve_filter(
    config: &LogConfig,
    level_override: Option<&str>,
    env_directive: Option<&str>,
) -> Result<EnvFilter, LoggingError> {
    match (level_override, env_directive) {
        (Some(level), _) => parse_filter(level),
        (None, Some(directive)) => parse_filter(directive),
        (None, None) => parse_filter(&config.level),
    }
}

/// Install the global subscriber.
pub fn init(config: &LogConfig, level_override: Option<&str>) -> Result<LogGuard, LoggingError> {
    let env_directive = std::env::var(LOG_ENV).ok();
    let filter = resolve_filter(config, level_override, env_directive.as_deref())?;

    let (file_layer, guard) = match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|source| LoggingError::Directory {
                path: dir.clone(),
                source,
            })?;

            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(config.file_prefix.clone())
                .max_log_files(config.max_files)
                .build(dir)
                .map_err(|source| LoggingError::Appender {
                    path: dir.clone(),
                    source,
                })?;

            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let console_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(config.ansi)
        .with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    Ok(LogGuard { _file: guard })
}
