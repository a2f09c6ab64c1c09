//! Coordinate types and limits.

use thiserror::Error;

/// Largest latitude representable by the spherical Mercator plane.
pub const MAX_LAT: f64 = 85.051_128_779_806_6;
/// Smallest latitude representable by the spherical Mercator plane.
pub const MIN_LAT: f64 = -MAX_LAT;
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;
pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 22;

/// Slippy-map tile address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub row: u32,
    pub col: u32,
    pub zoom: u8,
}

impl TileCoord {
    pub const fn new(col: u32, row: u32, zoom: u8) -> Self {
        Self { row, col, zoom }
    }

    /// Number of tiles along one axis at this tile's zoom.
    pub fn tiles_per_axis(&self) -> u32 {
        1u32 << self.zoom
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.col, self.row)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    #[error("latitude {0} is outside the projectable range")]
    InvalidLatitude(f64),
    #[error("longitude {0} is outside [-180, 180]")]
    InvalidLongitude(f64),
    #[error("zoom level {0} is not supported")]
    InvalidZoom(u8),
}
