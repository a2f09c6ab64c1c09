//! Addressable configuration keys.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::file::{parse_bool, parse_value, ConfigError, ConfigFile};
use crate::mosaic::MAX_SUPERSAMPLE;
use crate::provider::MapStyle;

const MAX_ZOOM_OFFSET: u8 = 4;

/// A single `section.key` entry of the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    TilesStyle,
    TilesSupersample,
    TilesZoomOffset,
    TilesTimeoutSecs,
    TilesTileSize,
    OverpassEndpoints,
    OverpassBoundaryTimeoutSecs,
    OverpassRoadsTimeoutSecs,
    GeocoderTimeoutSecs,
    GeocoderLanguage,
    ExportDirectory,
    ExportJpegQuality,
    ExportDimBackground,
    ExportMultiColor,
    CacheRoadEntries,
    CacheRoadTtlSecs,
    CacheTileMemoryMb,
    LoggingDirectory,
    LoggingLevel,
}

impl ConfigKey {
    /// Every key, grouped by section in file order.
    pub fn all() -> &'static [ConfigKey] {
        use ConfigKey::*;
        &[
            TilesStyle,
            TilesSupersample,
            TilesZoomOffset,
            TilesTimeoutSecs,
            TilesTileSize,
            OverpassEndpoints,
            OverpassBoundaryTimeoutSecs,
            OverpassRoadsTimeoutSecs,
            GeocoderTimeoutSecs,
            GeocoderLanguage,
            ExportDirectory,
            ExportJpegQuality,
            ExportDimBackground,
            ExportMultiColor,
            CacheRoadEntries,
            CacheRoadTtlSecs,
            CacheTileMemoryMb,
            LoggingDirectory,
            LoggingLevel,
        ]
    }

    pub fn section(&self) -> &'static str {
        use ConfigKey::*;
        match self {
            TilesStyle | TilesSupersample | TilesZoomOffset | TilesTimeoutSecs | TilesTileSize => "tiles",
            OverpassEndpoints | OverpassBoundaryTimeoutSecs | OverpassRoadsTimeoutSecs => "overpass",
            GeocoderTimeoutSecs | GeocoderLanguage => "geocoder",
            ExportDirectory | ExportJpegQuality | ExportDimBackground | ExportMultiColor => "export",
            CacheRoadEntries | CacheRoadTtlSecs | CacheTileMemoryMb => "cache",
            LoggingDirectory | LoggingLevel => "logging",
        }
    }

    pub fn key_name(&self) -> &'static str {
        use ConfigKey::*;
        match self {
            TilesStyle => "style",
            TilesSupersample => "supersample",
            TilesZoomOffset => "zoom_offset",
            TilesTimeoutSecs | GeocoderTimeoutSecs => "timeout_secs",
            TilesTileSize => "tile_size",
            OverpassEndpoints => "endpoints",
            OverpassBoundaryTimeoutSecs => "boundary_timeout_secs",
            OverpassRoadsTimeoutSecs => "roads_timeout_secs",
            GeocoderLanguage => "language",
            ExportDirectory | LoggingDirectory => "directory",
            ExportJpegQuality => "jpeg_quality",
            ExportDimBackground => "dim_background",
            ExportMultiColor => "multi_color",
            CacheRoadEntries => "road_entries",
            CacheRoadTtlSecs => "road_ttl_secs",
            CacheTileMemoryMb => "tile_memory_mb",
            LoggingLevel => "level",
        }
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value as written to the file; empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        use ConfigKey::*;
        match self {
            TilesStyle => config.tiles.style.to_string(),
            TilesSupersample => config.tiles.supersample.to_string(),
            TilesZoomOffset => config.tiles.zoom_offset.to_string(),
            TilesTimeoutSecs => config.tiles.timeout.as_secs().to_string(),
            TilesTileSize => config.tiles.tile_size.to_string(),
            OverpassEndpoints => config.overpass.endpoints.join(","),
            OverpassBoundaryTimeoutSecs => config.overpass.boundary_timeout.as_secs().to_string(),
            OverpassRoadsTimeoutSecs => config.overpass.roads_timeout.as_secs().to_string(),
            GeocoderTimeoutSecs => config.geocoder.timeout.as_secs().to_string(),
            GeocoderLanguage => config.geocoder.language.clone(),
            ExportDirectory => path_value(config.export.directory.as_ref()),
            ExportJpegQuality => config.export.jpeg_quality.to_string(),
            ExportDimBackground => config.export.dim_background.to_string(),
            ExportMultiColor => config.export.multi_color.to_string(),
            CacheRoadEntries => config.cache.road_entries.to_string(),
            CacheRoadTtlSecs => config.cache.road_ttl.as_secs().to_string(),
            CacheTileMemoryMb => config.cache.tile_memory_mb.to_string(),
            LoggingDirectory => path_value(config.logging.directory.as_ref()),
            LoggingLevel => config.logging.level.clone(),
        }
    }

    /// Validates `value` and stores it.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        use ConfigKey::*;
        let name = self.name();
        let key = name.as_str();
        let invalid = |reason: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        };

        match self {
            TilesStyle => config.tiles.style = parse_value::<MapStyle>(key, value)?,
            TilesSupersample => {
                let supersample: u32 = parse_value(key, value)?;
                if !(1..=MAX_SUPERSAMPLE).contains(&supersample) {
                    return Err(invalid("must be between 1 and 8"));
                }
                config.tiles.supersample = supersample;
            }
            TilesZoomOffset => {
                let offset: u8 = parse_value(key, value)?;
                if offset > MAX_ZOOM_OFFSET {
                    return Err(invalid("must be between 0 and 4"));
                }
                config.tiles.zoom_offset = offset;
            }
            TilesTimeoutSecs => config.tiles.timeout = parse_secs(key, value)?,
            TilesTileSize => {
                let size: u32 = parse_value(key, value)?;
                if !size.is_power_of_two() || size < 64 {
                    return Err(invalid("must be a power of two of at least 64"));
                }
                config.tiles.tile_size = size;
            }
            OverpassEndpoints => {
                let endpoints: Vec<String> = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect();
                if endpoints.is_empty() {
                    return Err(invalid("at least one endpoint is required"));
                }
                if let Some(bad) = endpoints.iter().find(|e| !e.starts_with("http")) {
                    return Err(invalid(&format!("'{}' is not an http(s) URL", bad)));
                }
                config.overpass.endpoints = endpoints;
            }
            OverpassBoundaryTimeoutSecs => config.overpass.boundary_timeout = parse_secs(key, value)?,
            OverpassRoadsTimeoutSecs => config.overpass.roads_timeout = parse_secs(key, value)?,
            GeocoderTimeoutSecs => config.geocoder.timeout = parse_secs(key, value)?,
            GeocoderLanguage => {
                let language = value.trim();
                if language.is_empty() {
                    return Err(invalid("language code is required"));
                }
                config.geocoder.language = language.to_string();
            }
            ExportDirectory => config.export.directory = parse_path(value),
            ExportJpegQuality => {
                let quality: u8 = parse_value(key, value)?;
                if !(1..=100).contains(&quality) {
                    return Err(invalid("must be between 1 and 100"));
                }
                config.export.jpeg_quality = quality;
            }
            ExportDimBackground => config.export.dim_background = parse_bool(key, value)?,
            ExportMultiColor => config.export.multi_color = parse_bool(key, value)?,
            CacheRoadEntries => {
                let entries: usize = parse_value(key, value)?;
                if entries == 0 {
                    return Err(invalid("must be at least 1"));
                }
                config.cache.road_entries = entries;
            }
            CacheRoadTtlSecs => config.cache.road_ttl = parse_secs(key, value)?,
            CacheTileMemoryMb => config.cache.tile_memory_mb = parse_value(key, value)?,
            LoggingDirectory => config.logging.directory = parse_path(value),
            LoggingLevel => {
                let level = value.trim().to_ascii_lowercase();
                tracing::Level::from_str(&level).map_err(|_| invalid("expected trace, debug, info, warn or error"))?;
                config.logging.level = level;
            }
        }
        Ok(())
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section(), self.key_name())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

fn parse_secs(key: &str, value: &str) -> Result<Duration, ConfigError> {
    let secs: u64 = parse_value(key, value)?;
    if secs == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: "timeout must be positive".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

fn parse_path(value: &str) -> Option<PathBuf> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
}

fn path_value(path: Option<&PathBuf>) -> String {
    path.map(|p| p.display().to_string()).unwrap_or_default()
}
