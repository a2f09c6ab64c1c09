//! Common types and utilities shared across CLI commands.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use geomosaic::coord::Viewport;
use geomosaic::provider::MapStyle;
use geomosaic::session::ApplyOutcome;

use crate::error::CliError;

/// Project file selection shared by every project command.
#[derive(Debug, Clone, Args)]
pub struct ProjectArgs {
    /// Project document to read and update
    #[arg(long, short = 'p', value_name = "FILE")]
    pub project: Option<PathBuf>,
}

/// Map style selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum StyleArg {
    /// Street map in elliptical Mercator
    Streets,
    /// Light OpenStreetMap rendering
    BrightV2,
    /// Inverted OpenStreetMap rendering
    Dark,
    /// No basemap, vectors only
    None,
}

impl From<StyleArg> for MapStyle {
    fn from(arg: StyleArg) -> Self {
        match arg {
            StyleArg::Streets => MapStyle::Streets,
            StyleArg::BrightV2 => MapStyle::BrightV2,
            StyleArg::Dark => MapStyle::Dark,
            StyleArg::None => MapStyle::None,
        }
    }
}

/// Viewport used for commands that do not render.
pub const DEFAULT_VIEWPORT: Viewport = Viewport::new(1600, 1000);

/// Turns a fetch outcome into a command result.
pub fn check_outcome(outcome: ApplyOutcome, what: &str) -> Result<(), CliError> {
    match outcome {
        ApplyOutcome::Applied => Ok(()),
        ApplyOutcome::Empty => Err(CliError::NotFound(format!("No {} found", what))),
        ApplyOutcome::Stale | ApplyOutcome::Cancelled => Err(CliError::Interrupted),
        ApplyOutcome::Failed(e) => Err(CliError::Fetch(e)),
    }
}
