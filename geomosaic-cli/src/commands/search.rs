//! Search command - look up places by name.

use console::style;

use crate::error::CliError;
use crate::runner::{spinner, CliRunner};

pub struct SearchArgs {
    pub query: String,
    pub limit: usize,
}

pub fn run(args: SearchArgs) -> Result<(), CliError> {
    let runner = CliRunner::new()?;
    runner.log_startup("search");
    let geocoder = runner.geocoder();

    let progress = spinner(format!("Searching for '{}'", args.query));
    let result = runner.block_on(geocoder.search(&args.query));
    progress.finish_and_clear();
    let candidates = result??;

    if candidates.is_empty() {
        println!("No places found for '{}'.", args.query);
        return Ok(());
    }

    for (i, candidate) in candidates.iter().take(args.limit).enumerate() {
        let element = candidate
            .osm
            .map(|osm| format!("{} {}", osm.kind, osm.id))
            .unwrap_or_else(|| "no OSM element".to_string());
        println!("{:>3}. {} ({})", i + 1, style(&candidate.name).bold(), element);
        println!(
            "     {}  [{:.5}, {:.5}]",
            candidate.display_name, candidate.location.lat, candidate.location.lon
        );
    }

    if candidates.iter().any(|c| c.osm.is_some()) {
        println!();
        println!("Add a region with 'geomosaic boundary add <id> --type <type>'.");
    }
    Ok(())
}
