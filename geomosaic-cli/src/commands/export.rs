//! Export command - render a project to a self-contained SVG file.

use std::path::PathBuf;

use geomosaic::coord::{ViewTransform, Viewport};
use geomosaic::geometry::GeoPoint;
use geomosaic::mosaic::MAX_SUPERSAMPLE;
use geomosaic::provider::MapStyle;
use geomosaic::session::ExportOutcome;

use super::common::{ProjectArgs, StyleArg};
use crate::error::CliError;
use crate::runner::{load_project, project_path, save_project, spinner, CliRunner};

const FIT_PADDING: u32 = 40;
const FIT_MAX_ZOOM: u8 = 14;
/// Largest accepted viewport side, in pixels.
pub const MAX_VIEWPORT_SIDE: u32 = 16_384;

pub struct ExportArgs {
    pub project: ProjectArgs,
    pub output: Option<PathBuf>,
    pub style: Option<StyleArg>,
    pub width: u32,
    pub height: u32,
    pub center: Option<GeoPoint>,
    pub zoom: Option<u8>,
    pub fit: bool,
    pub dim: Option<bool>,
    pub supersample: Option<u32>,
}

/// Parses `lon,lat`.
pub fn parse_center(s: &str) -> Result<GeoPoint, String> {
    let (lon, lat) = s
        .split_once(',')
        .ok_or_else(|| format!("expected 'lon,lat', got '{}'", s))?;
    let lon: f64 = lon.trim().parse().map_err(|e| format!("invalid longitude: {}", e))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("invalid latitude: {}", e))?;
    Ok(GeoPoint::new(lon, lat))
}

fn parse_bounded(s: &str, max: u32) -> Result<u32, String> {
    let value: u32 = s.trim().parse().map_err(|e| format!("invalid number: {}", e))?;
    if !(1..=max).contains(&value) {
        return Err(format!("must be between 1 and {}", max));
    }
    Ok(value)
}

/// Parses a viewport side in `1..=MAX_VIEWPORT_SIDE`.
pub fn parse_viewport_side(s: &str) -> Result<u32, String> {
    parse_bounded(s, MAX_VIEWPORT_SIDE)
}

/// Parses a supersample factor in `1..=MAX_SUPERSAMPLE`.
pub fn parse_supersample(s: &str) -> Result<u32, String> {
    parse_bounded(s, MAX_SUPERSAMPLE)
}

pub fn run(args: ExportArgs) -> Result<(), CliError> {
    let runner = CliRunner::new()?;
    runner.log_startup("export");
    let config = runner.config();
    let path = project_path(args.project.project);
    let document = load_project(&path, config)?;
    let had_view = document.view.is_some();

    let viewport = Viewport::new(args.width, args.height);
    if viewport.is_empty() {
        return Err(CliError::Config("viewport width and height must be positive".to_string()));
    }

    let mut export_settings = config.export.to_export_settings(&config.tiles);
    if let Some(supersample) = args.supersample {
        export_settings = export_settings.with_supersample(supersample);
    }
    let mut session = runner
        .session(&document, viewport)?
        .with_export_settings(export_settings);

    if let Some(style) = args.style {
        session.set_map_style(MapStyle::from(style));
    }
    if let Some(dim) = args.dim {
        session.set_dim_background(dim);
    }

    match (args.center, args.zoom) {
        (Some(center), Some(zoom)) => {
            let view = ViewTransform::centered(center, zoom, viewport, config.tiles.tile_size, session.view().crs())?;
            session.set_view(view);
        }
        (Some(_), None) | (None, Some(_)) => {
            return Err(CliError::Config("--center and --zoom must be given together".to_string()));
        }
        (None, None) if args.fit || !had_view => {
            if !session.fit_to_regions(FIT_PADDING, FIT_MAX_ZOOM)? {
                println!("No regions selected; exporting the default view.");
            }
        }
        (None, None) => {}
    }

    let progress = spinner(format!("Composing {} map", session.style().map_style));
    let outcome = runner.run(session.export(args.output, runner.cancel_token()));
    progress.finish_and_clear();

    match outcome? {
        ExportOutcome::Written { path: output, bytes, mosaic } => {
            println!("Exported {} ({} KiB)", output.display(), bytes / 1024);
            if let Some(stats) = mosaic {
                println!(
                    "  Tiles: {} drawn of {} ({} failed, {} from cache)",
                    stats.drawn, stats.requested, stats.failed, stats.cached
                );
            }
            save_project(&path, &session)
        }
        ExportOutcome::Cancelled => Err(CliError::Interrupted),
    }
}
