//! Layer commands - import GeoJSON annotation layers into a project.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use geomosaic::feature::{AnnotationLayer, FeatureCollection};
use geomosaic::project::ProjectDocument;
use geomosaic::render::resolve_color;

use super::common::ProjectArgs;
use crate::error::CliError;
use crate::runner::{load_project, project_path};

#[derive(Debug, Subcommand)]
pub enum LayerCommands {
    /// Import a GeoJSON FeatureCollection as a layer
    Add {
        #[command(flatten)]
        project: ProjectArgs,

        /// GeoJSON file
        file: PathBuf,

        /// Layer id; defaults to the file name
        #[arg(long)]
        id: Option<String>,

        /// Display name; defaults to the id
        #[arg(long)]
        name: Option<String>,

        /// Default colour for features without their own (e.g. #1e88e5)
        #[arg(long)]
        color: Option<String>,
    },

    /// Remove a layer by id
    Remove {
        #[command(flatten)]
        project: ProjectArgs,

        id: String,
    },

    /// List layers
    List {
        #[command(flatten)]
        project: ProjectArgs,
    },
}

pub fn run(command: LayerCommands) -> Result<(), CliError> {
    match command {
        LayerCommands::Add {
            project,
            file,
            id,
            name,
            color,
        } => run_add(project, &file, id, name, color),
        LayerCommands::Remove { project, id } => run_remove(project, &id),
        LayerCommands::List { project } => run_list(project),
    }
}

/// Reads a layer file into an annotation layer.
fn read_layer(file: &Path, id: Option<String>, name: Option<String>) -> Result<AnnotationLayer, CliError> {
    let layer_error = |reason: String| CliError::Layer {
        path: file.to_path_buf(),
        reason,
    };
    let json = std::fs::read_to_string(file).map_err(|e| layer_error(e.to_string()))?;
    let features: FeatureCollection = serde_json::from_str(&json).map_err(|e| layer_error(e.to_string()))?;
    if features.is_empty() {
        return Err(layer_error("no features".to_string()));
    }

    let id = id.unwrap_or_else(|| {
        file.file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "layer".to_string())
    });
    let name = name.unwrap_or_else(|| id.clone());
    Ok(AnnotationLayer::new(id, name, features))
}

fn run_add(
    project: ProjectArgs,
    file: &Path,
    id: Option<String>,
    name: Option<String>,
    color: Option<String>,
) -> Result<(), CliError> {
    let path = project_path(project.project);
    let config = geomosaic::config::ConfigFile::load()?;
    let mut document = load_project(&path, &config)?;

    let mut layer = read_layer(file, id, name)?;
    if let Some(color) = color {
        layer = layer.with_color(color);
    }
    let count = layer.features.len();
    let id = layer.id.clone();

    match document.layers.iter_mut().find(|l| l.id == layer.id) {
        Some(existing) => *existing = layer,
        None => document.layers.push(layer),
    }
    document.save(&path)?;
    println!("Layer {} with {} feature(s) saved to {}", id, count, path.display());
    Ok(())
}

fn run_remove(project: ProjectArgs, id: &str) -> Result<(), CliError> {
    let path = project_path(project.project);
    let mut document = ProjectDocument::load(&path)?;

    let before = document.layers.len();
    document.layers.retain(|l| l.id != id);
    if document.layers.len() == before {
        return Err(CliError::NotFound(format!("No layer with id '{}'", id)));
    }
    document.save(&path)?;
    println!("Removed layer {}", id);
    Ok(())
}

fn run_list(project: ProjectArgs) -> Result<(), CliError> {
    let path = project_path(project.project);
    let document = ProjectDocument::load(&path)?;

    if document.layers.is_empty() {
        println!("No layers.");
    }
    for layer in &document.layers {
        println!(
            "{:<20} {} ({} feature(s), colour {})",
            layer.id,
            layer.name,
            layer.features.len(),
            resolve_color(None, layer.color(), false)
        );
    }
    Ok(())
}
