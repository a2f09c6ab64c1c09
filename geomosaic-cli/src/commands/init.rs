//! Init command - write a configuration file with default settings.

use geomosaic::config::{config_file_path, ConfigFile};
use geomosaic::session::default_export_dir;

use crate::error::CliError;

pub fn run() -> Result<(), CliError> {
    let path = config_file_path();
    if path.exists() {
        println!("Configuration file already exists: {}", path.display());
        println!("Use 'geomosaic config set' to change individual settings.");
        return Ok(());
    }

    ConfigFile::default().save()?;

    println!("Configuration file: {}", path.display());
    println!("Exports go to:      {}", default_export_dir().display());
    println!();
    println!("Edit this file to change tile, geodata and export settings.");
    println!("Command line options override config file values.");
    Ok(())
}
