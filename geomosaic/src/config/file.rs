//! INI-backed configuration sections.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;
use tracing::debug;

use crate::boundary::{DEFAULT_BOUNDARY_TIMEOUT, DEFAULT_ROADS_TIMEOUT};
use crate::coord::DEFAULT_TILE_SIZE;
use crate::logging::LoggingConfig;
use crate::mosaic::{
    TileCache, DEFAULT_JPEG_QUALITY, DEFAULT_SUPERSAMPLE, DEFAULT_TILE_TIMEOUT, DEFAULT_ZOOM_OFFSET,
};
use crate::provider::{MapStyle, DEFAULT_OVERPASS_ENDPOINTS};
use crate::roads::RoadQueryCache;
use crate::session::{default_export_dir, ExportSettings};

pub const DEFAULT_GEOCODER_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_GEOCODER_LANGUAGE: &str = "ru";

const CONFIG_DIR_NAME: &str = "geomosaic";
const CONFIG_FILE_NAME: &str = "config.ini";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },

    #[error("failed to write config file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),
}

/// Location of the configuration file.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME)
}

/// Raster tile settings (`[tiles]`).
#[derive(Debug, Clone, PartialEq)]
pub struct TileConfig {
    pub style: MapStyle,
    pub supersample: u32,
    pub zoom_offset: u8,
    pub timeout: Duration,
    pub tile_size: u32,
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            style: MapStyle::default(),
            supersample: DEFAULT_SUPERSAMPLE,
            zoom_offset: DEFAULT_ZOOM_OFFSET,
            timeout: DEFAULT_TILE_TIMEOUT,
            tile_size: DEFAULT_TILE_SIZE,
        }
    }
}

impl TileConfig {
    pub fn with_style(mut self, style: MapStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_supersample(mut self, supersample: u32) -> Self {
        self.supersample = supersample.max(1);
        self
    }
}

/// Geodata query settings (`[overpass]`).
#[derive(Debug, Clone, PartialEq)]
pub struct OverpassConfig {
    pub endpoints: Vec<String>,
    pub boundary_timeout: Duration,
    pub roads_timeout: Duration,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            endpoints: DEFAULT_OVERPASS_ENDPOINTS.iter().map(|s| s.to_string()).collect(),
            boundary_timeout: DEFAULT_BOUNDARY_TIMEOUT,
            roads_timeout: DEFAULT_ROADS_TIMEOUT,
        }
    }
}

impl OverpassConfig {
    pub fn with_endpoints(mut self, endpoints: Vec<String>) -> Self {
        self.endpoints = endpoints;
        self
    }
}

/// Place search settings (`[geocoder]`).
#[derive(Debug, Clone, PartialEq)]
pub struct GeocoderConfig {
    pub timeout: Duration,
    pub language: String,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_GEOCODER_TIMEOUT,
            language: DEFAULT_GEOCODER_LANGUAGE.to_string(),
        }
    }
}

/// Export defaults (`[export]`).
#[derive(Debug, Clone, PartialEq)]
pub struct ExportConfig {
    /// Output directory; `None` means the downloads folder.
    pub directory: Option<PathBuf>,
    pub jpeg_quality: u8,
    pub dim_background: bool,
    pub multi_color: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: None,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            dim_background: false,
            multi_color: true,
        }
    }
}

impl ExportConfig {
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    /// Combines export and tile settings into session export parameters.
    pub fn to_export_settings(&self, tiles: &TileConfig) -> ExportSettings {
        ExportSettings::default()
            .with_supersample(tiles.supersample)
            .with_zoom_offset(tiles.zoom_offset)
            .with_jpeg_quality(self.jpeg_quality)
            .with_directory(self.directory.clone().unwrap_or_else(default_export_dir))
    }
}

/// Cache sizing (`[cache]`).
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    pub road_entries: usize,
    pub road_ttl: Duration,
    pub tile_memory_mb: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            road_entries: 32,
            road_ttl: Duration::from_secs(600),
            tile_memory_mb: 256,
        }
    }
}

impl CacheConfig {
    pub fn road_cache(&self) -> Arc<RoadQueryCache> {
        Arc::new(RoadQueryCache::new(self.road_entries, self.road_ttl))
    }

    pub fn tile_cache(&self) -> Arc<TileCache> {
        Arc::new(TileCache::new(self.tile_memory_mb * 1024 * 1024))
    }
}

/// The whole configuration file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigFile {
    pub tiles: TileConfig,
    pub overpass: OverpassConfig,
    pub geocoder: GeocoderConfig,
    pub export: ExportConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

impl ConfigFile {
    /// Loads the file at [`config_file_path`], or defaults if it does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        self.to_ini().write_to_file(path).map_err(write_err)?;
        debug!(path = %path.display(), "Config saved");
        Ok(())
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = ConfigFile::default();
        for key in super::ConfigKey::all() {
            let value = ini
                .section(Some(key.section()))
                .and_then(|section| section.get(key.key_name()));
            if let Some(value) = value {
                key.set(&mut config, value)?;
            }
        }
        Ok(config)
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        for key in super::ConfigKey::all() {
            let value = key.get(self);
            if !value.is_empty() {
                ini.with_section(Some(key.section())).set(key.key_name(), value);
            }
        }
        ini
    }
}

pub(super) fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

pub(super) fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}
