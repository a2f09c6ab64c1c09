//! Roads command - fetch the road network inside the selected regions.

use geomosaic::feature::RoadClass;
use geomosaic::roads::RoadFetchOptions;

use super::common::{check_outcome, ProjectArgs, DEFAULT_VIEWPORT};
use crate::error::CliError;
use crate::runner::{load_project, project_path, save_project, spinner, CliRunner};

pub struct RoadsArgs {
    pub project: ProjectArgs,
    pub federal: bool,
    pub regional: bool,
    pub clear: bool,
}

pub fn run(args: RoadsArgs) -> Result<(), CliError> {
    let runner = CliRunner::new()?;
    runner.log_startup("roads");
    let path = project_path(args.project.project);
    let document = load_project(&path, runner.config())?;
    let mut session = runner.session(&document, DEFAULT_VIEWPORT)?;

    if session.regions().is_empty() {
        return Err(CliError::NotFound(
            "No regions selected. Add one with 'geomosaic boundary add' first.".to_string(),
        ));
    }

    let options = RoadFetchOptions::new(args.federal, args.regional);
    if args.clear || options.is_empty() {
        let mut inputs = session.inputs();
        inputs.roads.clear();
        inputs.style.roads = options;
        session.restore(inputs);
    } else {
        let progress = spinner(format!("Fetching roads in {} region(s)", session.regions().len()));
        let outcome = runner.block_on(session.refresh_roads(options));
        progress.finish_and_clear();
        check_outcome(outcome?, "roads")?;
    }

    save_project(&path, &session)?;
    let federal = session.roads().iter().filter(|r| r.class() == RoadClass::Federal).count();
    println!(
        "{} road(s): {} federal, {} regional",
        session.roads().len(),
        federal,
        session.roads().len() - federal
    );
    Ok(())
}
