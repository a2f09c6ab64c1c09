//! Configuration commands: `config get`, `config set`, `config list` and
//! `config path`.

use clap::Subcommand;
use geomosaic::config::{config_file_path, ConfigFile, ConfigKey};

use crate::error::CliError;

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print one setting
    Get {
        /// Key in section.key form (e.g. tiles.style)
        key: String,
    },

    /// Change one setting
    Set {
        /// Key in section.key form (e.g. overpass.endpoints)
        key: String,

        /// New value
        value: String,
    },

    /// Print every setting grouped by section
    List,

    /// Print the configuration file location
    Path,
}

pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Get { key } => run_get(&key),
        ConfigCommands::Set { key, value } => run_set(&key, &value),
        ConfigCommands::List => run_list(),
        ConfigCommands::Path => run_path(),
    }
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown configuration key '{}'. Run 'geomosaic config list' for the available keys.",
            key
        ))
    })
}

fn run_get(key: &str) -> Result<(), CliError> {
    let key = parse_key(key)?;
    let config = ConfigFile::load()?;
    match key.get(&config) {
        value if value.is_empty() => println!("(not set)"),
        value => println!("{}", value),
    }
    Ok(())
}

fn run_set(key: &str, value: &str) -> Result<(), CliError> {
    let key = parse_key(key)?;
    let mut config = ConfigFile::load()?;
    key.set(&mut config, value)?;
    config.save()?;

    println!("{} = {}", key, key.get(&config));
    Ok(())
}

/// Lists every key; values changed from the defaults are marked with `*`.
fn run_list() -> Result<(), CliError> {
    let config = ConfigFile::load()?;
    let defaults = ConfigFile::default();
    let width = ConfigKey::all().iter().map(|k| k.key_name().len()).max().unwrap_or(0);

    let mut section = None;
    for key in ConfigKey::all() {
        if section != Some(key.section()) {
            if section.is_some() {
                println!();
            }
            println!("[{}]", key.section());
            section = Some(key.section());
        }

        let value = key.get(&config);
        let marker = if value != key.get(&defaults) { "*" } else { " " };
        let shown = if value.is_empty() { "(not set)" } else { value.as_str() };
        println!("{} {:<width$} = {}", marker, key.key_name(), shown, width = width);
    }
    Ok(())
}

fn run_path() -> Result<(), CliError> {
    println!("{}", config_file_path().display());
    Ok(())
}
