//! Configuration file
//!
//! Settings live in an INI file at `<config dir>/geomosaic/config.ini`.
//! A missing file yields defaults; unknown keys are ignored on load so that
//! older builds can read newer files.
//!
//! ```ini
//! [tiles]
//! style = streets
//! supersample = 4
//!
//! [overpass]
//! endpoints = https://overpass-api.de/api/interpreter
//! ```
//!
//! [`ConfigKey`] addresses single values by `section.key` for the CLI.

mod file;
mod keys;

pub use file::{
    config_file_path, CacheConfig, ConfigError, ConfigFile, ExportConfig, GeocoderConfig, OverpassConfig,
    TileConfig, DEFAULT_GEOCODER_LANGUAGE, DEFAULT_GEOCODER_TIMEOUT,
};
pub use keys::ConfigKey;
