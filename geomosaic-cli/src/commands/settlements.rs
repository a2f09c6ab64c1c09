//! Settlement commands - cities and towns inside the selected regions.

use clap::Subcommand;
use geomosaic::feature::OsmType;

use super::common::{check_outcome, ProjectArgs, DEFAULT_VIEWPORT};
use crate::error::CliError;
use crate::runner::{load_project, project_path, save_project, spinner, CliRunner};

#[derive(Debug, Subcommand)]
pub enum SettlementCommands {
    /// Fetch city and town boundaries and show them
    Fetch {
        #[command(flatten)]
        project: ProjectArgs,
    },

    /// Show or hide fetched settlements
    Show {
        #[command(flatten)]
        project: ProjectArgs,

        #[arg(action = clap::ArgAction::Set, default_value_t = true)]
        visible: bool,
    },

    /// Highlight a single city in place of the settlement layer
    Focus {
        #[command(flatten)]
        project: ProjectArgs,

        ids: Vec<u64>,

        #[arg(long = "type", default_value = "relation")]
        kind: OsmType,
    },

    /// Remove the highlighted city
    Unfocus {
        #[command(flatten)]
        project: ProjectArgs,
    },
}

pub fn run(command: SettlementCommands) -> Result<(), CliError> {
    let project = match &command {
        SettlementCommands::Fetch { project }
        | SettlementCommands::Show { project, .. }
        | SettlementCommands::Focus { project, .. }
        | SettlementCommands::Unfocus { project } => project.clone(),
    };

    let runner = CliRunner::new()?;
    runner.log_startup("settlements");
    let path = project_path(project.project);
    let document = load_project(&path, runner.config())?;
    let mut session = runner.session(&document, DEFAULT_VIEWPORT)?;

    match command {
        SettlementCommands::Fetch { .. } => {
            if session.regions().is_empty() {
                return Err(CliError::NotFound("No regions selected".to_string()));
            }
            let progress = spinner("Fetching settlements");
            let outcome = runner.block_on(session.refresh_settlements());
            progress.finish_and_clear();
            check_outcome(outcome?, "settlements")?;
            session.set_show_settlements(true);
            println!("{} settlement(s)", session.settlements().len());
        }
        SettlementCommands::Show { visible, .. } => {
            session.set_show_settlements(visible);
            println!("Settlements {}", if visible { "shown" } else { "hidden" });
        }
        SettlementCommands::Focus { ids, kind, .. } => {
            if ids.is_empty() {
                return Err(CliError::NotFound("No city ids given".to_string()));
            }
            let progress = spinner(format!("Fetching {} {:?}", kind, ids));
            let outcome = runner.block_on(session.focus_city(ids, kind));
            progress.finish_and_clear();
            check_outcome(outcome?, "city")?;
            if let Some(city) = session.focused_city() {
                println!("Focused on {}", city.name());
            }
        }
        SettlementCommands::Unfocus { .. } => {
            session.clear_focus();
            println!("Focus cleared");
        }
    }

    save_project(&path, &session)
}
