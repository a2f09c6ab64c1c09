//! Raster tile sources and map styles.
//!
//! # Templates
//!
//! A tile source is a URL template with `{x}`, `{y}`, `{z}` placeholders and
//! an optional `{s}` subdomain placeholder:
//!
//! - Streets: `https://core-renderer-tiles.maps.yandex.net/tiles?l=map&x={x}&y={y}&z={z}&lang=ru_RU&scale=2`
//! - Bright and dark: `https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png`
//!
//! The streets service lays its tiles out on the ellipsoidal World Mercator
//! grid, so views built for it must use [`Crs::WorldMercator`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::coord::{Crs, TileCoord};

pub const STREETS_TEMPLATE: &str =
    "https://core-renderer-tiles.maps.yandex.net/tiles?l=map&x={x}&y={y}&z={z}&lang=ru_RU&scale=2";
pub const OSM_TEMPLATE: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";

const OSM_SUBDOMAINS: [&str; 3] = ["a", "b", "c"];
const OSM_MAX_ZOOM: u8 = 19;
const STREETS_MAX_ZOOM: u8 = 21;

/// Base map appearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapStyle {
    #[default]
    Streets,
    BrightV2,
    Dark,
    /// No raster; vectors over a flat background.
    None,
}

impl MapStyle {
    pub const ALL: [MapStyle; 4] = [MapStyle::Streets, MapStyle::BrightV2, MapStyle::Dark, MapStyle::None];

    pub fn name(&self) -> &'static str {
        match self {
            MapStyle::Streets => "streets",
            MapStyle::BrightV2 => "bright_v2",
            MapStyle::Dark => "dark",
            MapStyle::None => "none",
        }
    }

    pub fn crs(&self) -> Crs {
        match self {
            MapStyle::Streets => Crs::WorldMercator,
            _ => Crs::WebMercator,
        }
    }

    /// Tile source for this style, or `None` when no raster is drawn.
    pub fn tile_source(&self) -> Option<TileSource> {
        match self {
            MapStyle::Streets => Some(TileSource::new(STREETS_TEMPLATE, STREETS_MAX_ZOOM)),
            MapStyle::BrightV2 | MapStyle::Dark => Some(
                TileSource::new(OSM_TEMPLATE, OSM_MAX_ZOOM).with_subdomains(OSM_SUBDOMAINS.iter().copied()),
            ),
            MapStyle::None => None,
        }
    }

    /// Whether the composed raster is inverted (difference against white).
    pub fn inverts_raster(&self) -> bool {
        matches!(self, MapStyle::Dark)
    }

    /// Fill painted beneath everything in exported documents.
    pub fn export_background(&self) -> &'static str {
        match self {
            MapStyle::None => "#0a0a0a",
            _ => "#ffffff",
        }
    }
}

impl fmt::Display for MapStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MapStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        MapStyle::ALL
            .into_iter()
            .find(|style| style.name() == normalized)
            .ok_or_else(|| {
                format!(
                    "unknown map style '{}' (expected one of: streets, bright_v2, dark, none)",
                    s
                )
            })
    }
}

/// A templated raster tile endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileSource {
    template: String,
    subdomains: Vec<String>,
    max_zoom: u8,
}

impl TileSource {
    pub fn new(template: impl Into<String>, max_zoom: u8) -> Self {
        Self {
            template: template.into(),
            subdomains: Vec::new(),
            max_zoom,
        }
    }

    pub fn with_subdomains<'a>(mut self, subdomains: impl IntoIterator<Item = &'a str>) -> Self {
        self.subdomains = subdomains.into_iter().map(str::to_string).collect();
        self
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn max_zoom(&self) -> u8 {
        self.max_zoom
    }

    /// Builds the URL for a tile.
    ///
    /// Subdomains rotate on `x + y` so that neighbouring tiles spread across
    /// hosts.
    pub fn url(&self, tile: &TileCoord) -> String {
        let mut url = self
            .template
            .replace("{x}", &tile.col.to_string())
            .replace("{y}", &tile.row.to_string())
            .replace("{z}", &tile.zoom.to_string());

        if !self.subdomains.is_empty() {
            let idx = (tile.col as usize + tile.row as usize) % self.subdomains.len();
            url = url.replace("{s}", &self.subdomains[idx]);
        }

        url
    }
}
