//! Shared command plumbing: configuration, logging, runtime, cancellation
//! and construction of the compositing session.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use geomosaic::boundary::BoundaryFetcher;
use geomosaic::config::ConfigFile;
use geomosaic::coord::{ViewTransform, Viewport};
use geomosaic::geometry::GeoPoint;
use geomosaic::logging::{init_logging, LoggingGuard};
use geomosaic::mosaic::MosaicBuilder;
use geomosaic::project::ProjectDocument;
use geomosaic::provider::{AsyncReqwestClient, Geocoder, OverpassClient};
use geomosaic::session::{CompositingSession, StyleSettings};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::CliError;

/// Default project document in the working directory.
pub const DEFAULT_PROJECT_FILE: &str = "geomosaic.json";

/// Center used before any region has been selected.
const INITIAL_CENTER: GeoPoint = GeoPoint::new(37.62, 55.75);
const INITIAL_ZOOM: u8 = 5;

pub type Session = CompositingSession<AsyncReqwestClient>;

/// Owns everything a command needs for the lifetime of one invocation.
pub struct CliRunner {
    config: ConfigFile,
    runtime: Runtime,
    http: AsyncReqwestClient,
    cancel: CancellationToken,
    _logging: LoggingGuard,
}

impl CliRunner {
    /// Loads configuration, starts logging and installs the Ctrl+C handler.
    pub fn new() -> Result<Self, CliError> {
        let config = ConfigFile::load()?;
        let logging = init_logging(&config.logging)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(CliError::Runtime)?;
        let http = AsyncReqwestClient::new().map_err(CliError::Http)?;

        let cancel = CancellationToken::new();
        let handler_token = cancel.clone();
        ctrlc::set_handler(move || handler_token.cancel())
            .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

        Ok(Self {
            config,
            runtime,
            http,
            cancel,
            _logging: logging,
        })
    }

    pub fn log_startup(&self, command: &str) {
        info!(command, version = geomosaic::VERSION, "geomosaic starting");
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Drives `future` to completion unless Ctrl+C arrives first.
    pub fn block_on<F: Future>(&self, future: F) -> Result<F::Output, CliError> {
        let cancel = self.cancel.clone();
        self.runtime.block_on(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(CliError::Interrupted),
                output = future => Ok(output),
            }
        })
    }

    /// Drives `future` to completion; the future observes the cancel token itself.
    pub fn run<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    pub fn geocoder(&self) -> Geocoder<AsyncReqwestClient> {
        Geocoder::new(
            self.http.clone(),
            self.config.geocoder.timeout,
            self.config.geocoder.language.clone(),
        )
    }

    /// Builds a session restored from `project`.
    pub fn session(&self, project: &ProjectDocument, viewport: Viewport) -> Result<Session, CliError> {
        let overpass = OverpassClient::new(self.http.clone(), self.config.overpass.endpoints.clone());
        let fetcher = BoundaryFetcher::new(overpass)
            .with_timeouts(self.config.overpass.boundary_timeout, self.config.overpass.roads_timeout)
            .with_road_cache(self.config.cache.road_cache());
        let mosaic = MosaicBuilder::new(self.http.clone())
            .with_cache(self.config.cache.tile_cache())
            .with_tile_timeout(self.config.tiles.timeout);

        let inputs = project.to_session_inputs()?;
        let view = ViewTransform::centered(
            INITIAL_CENTER,
            INITIAL_ZOOM,
            viewport,
            self.config.tiles.tile_size,
            inputs.style.map_style.crs(),
        )?;

        let mut session = CompositingSession::new(Arc::new(fetcher), mosaic, view, viewport)
            .with_export_settings(self.config.export.to_export_settings(&self.config.tiles));
        session.restore(inputs);
        Ok(session)
    }
}

/// Project path from the command line or the default file name.
pub fn project_path(arg: Option<PathBuf>) -> PathBuf {
    arg.unwrap_or_else(|| PathBuf::from(DEFAULT_PROJECT_FILE))
}

/// Loads a project, or starts a fresh one seeded from configuration.
pub fn load_project(path: &Path, config: &ConfigFile) -> Result<ProjectDocument, CliError> {
    if path.exists() {
        return Ok(ProjectDocument::load(path)?);
    }
    Ok(ProjectDocument {
        style: StyleSettings::default()
            .with_map_style(config.tiles.style)
            .with_dim_background(config.export.dim_background)
            .with_multi_color(config.export.multi_color),
        ..ProjectDocument::default()
    })
}

/// Writes the session state back to the project file.
pub fn save_project(path: &Path, session: &Session) -> Result<(), CliError> {
    ProjectDocument::from_session_inputs(&session.inputs()).save(path)?;
    Ok(())
}

/// Spinner shown while waiting on the network.
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message.into());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}
