//! CLI error type.

use std::fmt;
use std::path::PathBuf;

use geomosaic::config::ConfigError;
use geomosaic::coord::CoordError;
use geomosaic::logging::LoggingError;
use geomosaic::project::ProjectError;
use geomosaic::provider::{FetchError, ProviderError};
use geomosaic::session::SessionError;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug)]
pub enum CliError {
    Config(String),
    Logging(LoggingError),
    Runtime(std::io::Error),
    Http(ProviderError),
    Fetch(FetchError),
    Project(ProjectError),
    Session(SessionError),
    View(CoordError),
    Layer { path: PathBuf, reason: String },
    NotFound(String),
    Interrupted,
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Logging(e) => write!(f, "Logging error: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::Http(e) => write!(f, "HTTP client error: {}", e),
            CliError::Fetch(e) => write!(f, "Fetch failed: {}", e),
            CliError::Project(e) => write!(f, "Project error: {}", e),
            CliError::Session(e) => write!(f, "{}", e),
            CliError::View(e) => write!(f, "Invalid view: {}", e),
            CliError::Layer { path, reason } => {
                write!(f, "Cannot import layer {}: {}", path.display(), reason)
            }
            CliError::NotFound(what) => write!(f, "{}", what),
            CliError::Interrupted => write!(f, "Interrupted"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Logging(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::Http(e) => Some(e),
            CliError::Fetch(e) => Some(e),
            CliError::Project(e) => Some(e),
            CliError::Session(e) => Some(e),
            CliError::View(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

impl From<ProjectError> for CliError {
    fn from(e: ProjectError) -> Self {
        CliError::Project(e)
    }
}

impl From<SessionError> for CliError {
    fn from(e: SessionError) -> Self {
        CliError::Session(e)
    }
}

impl From<CoordError> for CliError {
    fn from(e: CoordError) -> Self {
        CliError::View(e)
    }
}

impl From<FetchError> for CliError {
    fn from(e: FetchError) -> Self {
        CliError::Fetch(e)
    }
}
