//! Boundary commands - manage the regions selected in a project.

use clap::Subcommand;
use geomosaic::feature::{osm_identity, OsmType};
use geomosaic::project::ProjectDocument;

use super::common::{check_outcome, ProjectArgs, DEFAULT_VIEWPORT};
use crate::error::CliError;
use crate::runner::{load_project, project_path, save_project, spinner, CliRunner};

#[derive(Debug, Subcommand)]
pub enum BoundaryCommands {
    /// Fetch a region and add it to the project
    Add {
        #[command(flatten)]
        project: ProjectArgs,

        /// OSM element ids forming one region
        #[arg(required_unless_present = "search")]
        ids: Vec<u64>,

        /// Element type of the ids
        #[arg(long = "type", default_value = "relation")]
        kind: OsmType,

        /// Use the first search result instead of explicit ids
        #[arg(long, conflicts_with = "ids")]
        search: Option<String>,
    },

    /// Remove a region by its identity (e.g. osm-2555133)
    Remove {
        #[command(flatten)]
        project: ProjectArgs,

        id: String,
    },

    /// List the selected regions
    List {
        #[command(flatten)]
        project: ProjectArgs,
    },
}

pub fn run(command: BoundaryCommands) -> Result<(), CliError> {
    match command {
        BoundaryCommands::Add {
            project,
            ids,
            kind,
            search,
        } => run_add(project, ids, kind, search),
        BoundaryCommands::Remove { project, id } => run_remove(project, &id),
        BoundaryCommands::List { project } => run_list(project),
    }
}

fn run_add(project: ProjectArgs, ids: Vec<u64>, kind: OsmType, search: Option<String>) -> Result<(), CliError> {
    let runner = CliRunner::new()?;
    runner.log_startup("boundary add");
    let path = project_path(project.project);
    let document = load_project(&path, runner.config())?;
    let mut session = runner.session(&document, DEFAULT_VIEWPORT)?;

    let (ids, kind) = match search {
        Some(text) => {
            let progress = spinner(format!("Searching for '{}'", text));
            let candidates = runner.block_on(runner.geocoder().search(&text));
            progress.finish_and_clear();
            let osm = candidates??
                .into_iter()
                .find_map(|c| c.osm)
                .ok_or_else(|| CliError::NotFound(format!("No OSM element found for '{}'", text)))?;
            (vec![osm.id], osm.kind)
        }
        None => (ids, kind),
    };

    let identity = osm_identity(&ids);
    let progress = spinner(format!("Fetching {} {:?}", kind, ids));
    let outcome = runner.block_on(session.select_boundary(ids, kind));
    progress.finish_and_clear();
    check_outcome(outcome?, "boundary")?;

    save_project(&path, &session)?;
    let added = session.regions().iter().find(|r| r.id() == identity);
    if let Some(region) = added.or_else(|| session.regions().last()) {
        let rings = region.rings().count();
        let open = region.rings().filter(|r| r.is_degenerate()).count();
        println!("Added {} ({}): {} ring(s)", region.name(), region.id(), rings);
        if open > 0 {
            println!("  warning: {} ring(s) could not be closed and will not clip", open);
        }
    }
    println!("Project: {}", path.display());
    Ok(())
}

fn run_remove(project: ProjectArgs, id: &str) -> Result<(), CliError> {
    let runner = CliRunner::new()?;
    let path = project_path(project.project);
    let document = load_project(&path, runner.config())?;
    let mut session = runner.session(&document, DEFAULT_VIEWPORT)?;

    let had_roads = !session.roads().is_empty();
    let had_settlements = !session.settlements().is_empty();
    if !session.remove_boundary(id) {
        return Err(CliError::NotFound(format!("No region with identity '{}'", id)));
    }
    println!("Removed {}", id);

    // Roads and settlements were dropped with the old region set.
    if !session.regions().is_empty() {
        if had_roads {
            let options = session.style().roads;
            let progress = spinner(format!("Re-fetching roads in {} region(s)", session.regions().len()));
            let outcome = runner.block_on(session.refresh_roads(options));
            progress.finish_and_clear();
            check_outcome(outcome?, "roads")?;
            println!("{} road(s) in remaining regions", session.roads().len());
        }
        if had_settlements {
            let progress = spinner("Re-fetching settlements");
            let outcome = runner.block_on(session.refresh_settlements());
            progress.finish_and_clear();
            check_outcome(outcome?, "settlements")?;
        }
    }
    save_project(&path, &session)?;
    Ok(())
}

fn run_list(project: ProjectArgs) -> Result<(), CliError> {
    let path = project_path(project.project);
    if !path.exists() {
        println!("No project at {}", path.display());
        return Ok(());
    }
    let document = ProjectDocument::load(&path)?;

    if document.boundaries.is_empty() {
        println!("No regions selected.");
    }
    for region in &document.boundaries {
        let level = region
            .admin_level()
            .map(|l| format!("admin_level {}", l))
            .unwrap_or_else(|| "no admin_level".to_string());
        println!("{:<24} {} ({})", region.id(), region.name(), level);
    }
    if !document.roads.is_empty() {
        println!();
        println!("{} road(s) cached in project", document.roads.len());
    }
    if let Some(city) = &document.focused_city {
        println!("Focused city: {}", city.name());
    }
    Ok(())
}
