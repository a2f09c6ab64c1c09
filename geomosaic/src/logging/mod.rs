//! Logging setup
//!
//! Installs the process-wide `tracing` subscriber. The library itself only
//! emits events; binaries call [`init_logging`] once at startup and keep the
//! returned guard alive until exit so buffered file output is flushed.

use std::path::PathBuf;

use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const LOG_FILE_PREFIX: &str = "geomosaic.log";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to create log directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to install subscriber: {0}")]
    Init(String),
}

/// Logging settings (`[logging]` in the config file).
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Directory for daily log files; stderr only when `None`.
    pub directory: Option<PathBuf>,
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Filter directive used when `RUST_LOG` is not set.
    pub fn default_directive(&self) -> String {
        format!("geomosaic={}", self.level)
    }
}

/// Keeps the non-blocking file writer alive.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Installs a stderr layer and, when configured, a daily-rolling file layer.
///
/// `RUST_LOG` overrides the configured level.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard, LoggingError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.default_directive()));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(LocalTime::new(Rfc3339))
        .with_target(false);

    let (file_layer, guard) = match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|source| LoggingError::CreateDir {
                path: dir.clone(),
                source,
            })?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_timer(LocalTime::new(Rfc3339))
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    Ok(LoggingGuard { _file: guard })
}
