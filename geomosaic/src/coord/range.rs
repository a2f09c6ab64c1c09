//! Tile ranges covering a pixel rectangle.

use super::crs::Crs;
use super::tile_to_geo;
use super::types::TileCoord;
use crate::geometry::{GeoBounds, PlanarPoint};

/// Inclusive block of tiles at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub zoom: u8,
    pub min_col: u32,
    pub max_col: u32,
    pub min_row: u32,
    pub max_row: u32,
}

impl TileRange {
    /// Tiles touching the world-pixel rectangle spanned by `nw` and `se`.
    ///
    /// Indices are clamped to the tile grid of `zoom`. Returns `None` when the
    /// rectangle has no area.
    pub fn covering(nw: PlanarPoint, se: PlanarPoint, tile_size: u32, zoom: u8) -> Option<Self> {
        if !(se.x > nw.x && se.y > nw.y) || tile_size == 0 {
            return None;
        }

        let ts = tile_size as f64;
        let last = ((1u64 << zoom) - 1) as f64;
        let index = |v: f64| (v / ts).floor().clamp(0.0, last) as u32;

        Some(Self {
            zoom,
            min_col: index(nw.x),
            max_col: index(se.x),
            min_row: index(nw.y),
            max_row: index(se.y),
        })
    }

    pub fn columns(&self) -> u32 {
        self.max_col - self.min_col + 1
    }

    pub fn rows(&self) -> u32 {
        self.max_row - self.min_row + 1
    }

    pub fn len(&self) -> usize {
        self.columns() as usize * self.rows() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row-major iteration over the range.
    pub fn iter(&self) -> impl Iterator<Item = TileCoord> + '_ {
        (self.min_row..=self.max_row).flat_map(move |row| {
            (self.min_col..=self.max_col).map(move |col| TileCoord::new(col, row, self.zoom))
        })
    }

    /// Geographic extent of the whole block.
    pub fn geo_bounds(&self, crs: Crs) -> GeoBounds {
        let nw = tile_to_geo(&TileCoord::new(self.min_col, self.min_row, self.zoom), crs);
        let se = tile_to_geo(
            &TileCoord::new(self.max_col + 1, self.max_row + 1, self.zoom),
            crs,
        );
        GeoBounds {
            west: nw.lon,
            north: nw.lat,
            east: se.lon,
            south: se.lat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_covering_inclusive_bounds() {
        let range = TileRange::covering(
            PlanarPoint::new(300.0, 10.0),
            PlanarPoint::new(1100.0, 520.0),
            256,
            4,
        )
        .unwrap();

        assert_eq!((range.min_col, range.max_col), (1, 4));
        assert_eq!((range.min_row, range.max_row), (0, 2));
        assert_eq!(range.len(), 12);
        assert_eq!(range.iter().count(), 12);
        assert_eq!(range.iter().next(), Some(TileCoord::new(1, 0, 4)));
    }

    #[test]
    fn test_covering_clamps_to_grid() {
        let range = TileRange::covering(
            PlanarPoint::new(-500.0, -500.0),
            PlanarPoint::new(5000.0, 5000.0),
            256,
            2,
        )
        .unwrap();
        assert_eq!((range.min_col, range.max_col), (0, 3));
        assert_eq!((range.min_row, range.max_row), (0, 3));
    }

    #[test]
    fn test_covering_rejects_empty_rect() {
        let p = PlanarPoint::new(10.0, 10.0);
        assert!(TileRange::covering(p, p, 256, 3).is_none());
    }

    #[test]
    fn test_geo_bounds_whole_world() {
        let range = TileRange {
            zoom: 1,
            min_col: 0,
            max_col: 1,
            min_row: 0,
            max_row: 1,
        };
        let bounds = range.geo_bounds(Crs::WebMercator);
        assert!((bounds.west + 180.0).abs() < 1e-9);
        assert!((bounds.east - 180.0).abs() < 1e-9);
        assert!(bounds.north > 85.0 && bounds.south < -85.0);
    }
}
