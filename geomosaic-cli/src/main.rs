//! Geomosaic command line interface.
//!
//! Projects are JSON documents (`geomosaic.json` by default) that accumulate
//! regions, roads, settlements and annotation layers across invocations and
//! are rendered with `geomosaic export`.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use geomosaic::geometry::GeoPoint;

use commands::boundary::BoundaryCommands;
use commands::common::{ProjectArgs, StyleArg};
use commands::config::ConfigCommands;
use commands::export::{parse_center, parse_supersample, parse_viewport_side, ExportArgs};
use commands::layer::LayerCommands;
use commands::roads::RoadsArgs;
use commands::search::SearchArgs;
use commands::settlements::SettlementCommands;
use error::CliError;

#[derive(Parser)]
#[command(name = "geomosaic")]
#[command(version, about = "Compose administrative boundaries, roads and annotations into SVG maps", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a configuration file with default settings
    Init,

    /// View or change configuration settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Search for places by name
    Search {
        /// Place name
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Maximum number of results to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Manage the regions selected in a project
    Boundary {
        #[command(subcommand)]
        command: BoundaryCommands,
    },

    /// Fetch roads inside the selected regions
    Roads {
        #[command(flatten)]
        project: ProjectArgs,

        /// Skip federal routes
        #[arg(long)]
        no_federal: bool,

        /// Include regional roads
        #[arg(long)]
        regional: bool,

        /// Remove all roads from the project
        #[arg(long)]
        clear: bool,
    },

    /// Fetch, show or focus settlements
    Settlements {
        #[command(subcommand)]
        command: SettlementCommands,
    },

    /// Manage annotation layers
    Layer {
        #[command(subcommand)]
        command: LayerCommands,
    },

    /// Render the project to an SVG file
    Export {
        #[command(flatten)]
        project: ProjectArgs,

        /// Output file; defaults to a timestamped name in the export directory
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Basemap style
        #[arg(long, value_enum)]
        style: Option<StyleArg>,

        /// Output width in pixels
        #[arg(long, default_value_t = 1600, value_parser = parse_viewport_side)]
        width: u32,

        /// Output height in pixels
        #[arg(long, default_value_t = 1000, value_parser = parse_viewport_side)]
        height: u32,

        /// Map center as lon,lat (requires --zoom)
        #[arg(long, value_parser = parse_center, allow_hyphen_values = true)]
        center: Option<GeoPoint>,

        /// Zoom level (requires --center)
        #[arg(long)]
        zoom: Option<u8>,

        /// Reframe the view around the selected regions
        #[arg(long)]
        fit: bool,

        /// Darken everything outside the selected regions
        #[arg(long)]
        dim: Option<bool>,

        /// Raster resolution multiplier (1-8)
        #[arg(long, value_parser = parse_supersample)]
        supersample: Option<u32>,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => commands::init::run(),
        Commands::Config { command } => commands::config::run(command),
        Commands::Search { query, limit } => commands::search::run(SearchArgs {
            query: query.join(" "),
            limit,
        }),
        Commands::Boundary { command } => commands::boundary::run(command),
        Commands::Roads {
            project,
            no_federal,
            regional,
            clear,
        } => commands::roads::run(RoadsArgs {
            project,
            federal: !no_federal,
            regional,
            clear,
        }),
        Commands::Settlements { command } => commands::settlements::run(command),
        Commands::Layer { command } => commands::layer::run(command),
        Commands::Export {
            project,
            output,
            style,
            width,
            height,
            center,
            zoom,
            fit,
            dim,
            supersample,
        } => commands::export::run(ExportArgs {
            project,
            output,
            style,
            width,
            height,
            center,
            zoom,
            fit,
            dim,
            supersample,
        }),
    };

    if let Err(e) = result {
        exit_with_error(e);
    }
}

fn exit_with_error(e: CliError) -> ! {
    eprintln!("Error: {}", e);
    let code = match e {
        CliError::Interrupted => 130,
        _ => 1,
    };
    process::exit(code);
}
