//! Coordinate conversion module
//!
//! Converts geographic positions to world pixels for both tile projections,
//! and from there into the two planes the compositor draws on:
//!
//! - **container space**: pixels relative to the visible viewport's
//!   north-west corner at the live zoom. All vector layers live here.
//! - **tile space**: world pixels at an elevated export zoom. Raster tiles
//!   are placed in this plane.
//!
//! Keeping vectors out of tile space matters: a vector projected there and a
//! raster placed in container space drift apart by the zoom ratio.

mod crs;
mod range;
mod types;
mod view;

pub use crs::Crs;
pub use range::TileRange;
pub use types::{CoordError, TileCoord, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON, MIN_ZOOM};
pub use view::{ViewTransform, Viewport, DEFAULT_TILE_SIZE};

use crate::geometry::{GeoPoint, PlanarPoint};

/// Edge length of the world plane at `zoom`, in pixels.
#[inline]
pub fn world_size(zoom: u8, tile_size: u32) -> f64 {
    tile_size as f64 * 2.0_f64.powi(zoom as i32)
}

/// Projects a position into world pixels.
///
/// Latitudes beyond the projection limit are clamped rather than rejected so
/// that polar slivers of a boundary still land on the plane edge.
#[inline]
pub fn world_pixel(p: GeoPoint, zoom: u8, tile_size: u32, crs: Crs) -> PlanarPoint {
    let size = world_size(zoom, tile_size);
    let (x, y) = crs.normalize(p);
    PlanarPoint::new(x * size, y * size)
}

/// Inverse of [`world_pixel`].
#[inline]
pub fn unproject_world_pixel(p: PlanarPoint, zoom: u8, tile_size: u32, crs: Crs) -> GeoPoint {
    let size = world_size(zoom, tile_size);
    crs.denormalize(p.x / size, p.y / size)
}

/// Projects a position into container pixels for `view`.
#[inline]
pub fn project_to_container(p: GeoPoint, view: &ViewTransform) -> PlanarPoint {
    let world = world_pixel(p, view.zoom(), view.tile_size(), view.crs());
    let origin = view.origin_pixel();
    PlanarPoint::new(world.x - origin.x, world.y - origin.y)
}

/// Projects a vertex sequence into container pixels.
pub fn project_line_to_container(points: &[GeoPoint], view: &ViewTransform) -> Vec<PlanarPoint> {
    points.iter().map(|p| project_to_container(*p, view)).collect()
}

/// Projects a position into world pixels at `export_zoom`.
///
/// Used only for raster tile placement.
#[inline]
pub fn project_to_tile_space(p: GeoPoint, view: &ViewTransform, export_zoom: u8) -> PlanarPoint {
    world_pixel(p, export_zoom, view.tile_size(), view.crs())
}

/// North-west corner of a tile.
#[inline]
pub fn tile_to_geo(tile: &TileCoord, crs: Crs) -> GeoPoint {
    let n = 2.0_f64.powi(tile.zoom as i32);
    crs.denormalize(tile.col as f64 / n, tile.row as f64 / n)
}

/// Tile containing a position.
#[inline]
pub fn to_tile_coords(p: GeoPoint, zoom: u8, crs: Crs) -> Result<TileCoord, CoordError> {
    if !(MIN_LAT..=MAX_LAT).contains(&p.lat) {
        return Err(CoordError::InvalidLatitude(p.lat));
    }
    if !(MIN_LON..=MAX_LON).contains(&p.lon) {
        return Err(CoordError::InvalidLongitude(p.lon));
    }
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }

    let n = 2.0_f64.powi(zoom as i32);
    let last = n - 1.0;
    let (x, y) = crs.normalize(p);
    Ok(TileCoord {
        col: (x * n).floor().clamp(0.0, last) as u32,
        row: (y * n).floor().clamp(0.0, last) as u32,
        zoom,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_york_city_at_zoom_16() {
        let tile = to_tile_coords(GeoPoint::new(-74.0060, 40.7128), 16, Crs::WebMercator).unwrap();
        assert_eq!(tile.row, 24640);
        assert_eq!(tile.col, 19295);
        assert_eq!(tile.zoom, 16);
    }

    #[test]
    fn test_invalid_latitude() {
        let result = to_tile_coords(GeoPoint::new(0.0, 90.0), 10, Crs::WebMercator);
        assert!(matches!(result, Err(CoordError::InvalidLatitude(_))));
    }

    #[test]
    fn test_tile_to_geo_northwest_corner() {
        let tile = TileCoord::new(19295, 24640, 16);
        let p = tile_to_geo(&tile, Crs::WebMercator);
        assert!((p.lat - 40.713).abs() < 0.01);
        assert!((p.lon - (-74.007)).abs() < 0.01);
    }

    #[test]
    fn test_container_origin_is_zero() {
        let origin = GeoPoint::new(37.0, 56.0);
        let view = ViewTransform::new(origin, 8, 256, Crs::WebMercator).unwrap();
        let p = project_to_container(origin, &view);
        assert!(p.x.abs() < 1e-9 && p.y.abs() < 1e-9);
    }

    #[test]
    fn test_tile_space_scales_with_export_zoom() {
        let view = ViewTransform::new(GeoPoint::new(30.0, 60.0), 8, 256, Crs::WebMercator).unwrap();
        let p = GeoPoint::new(30.5, 59.8);

        let live = world_pixel(p, 8, 256, Crs::WebMercator);
        let export = project_to_tile_space(p, &view, 10);
        assert!((export.x - live.x * 4.0).abs() < 1e-6);
        assert!((export.y - live.y * 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_world_mercator_shifts_tiles() {
        let p = GeoPoint::new(37.62, 55.75);
        let web = to_tile_coords(p, 14, Crs::WebMercator).unwrap();
        let world = to_tile_coords(p, 14, Crs::WorldMercator).unwrap();
        assert_eq!(web.col, world.col);
        assert!(world.row > web.row);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_container_roundtrip(
                lat in -80.0..80.0_f64,
                lon in -179.0..179.0_f64,
                zoom in 3u8..=18,
                dx in -200.0..200.0_f64,
                dy in -200.0..200.0_f64,
            ) {
                let view = ViewTransform::new(GeoPoint::new(lon, lat), zoom, 256, Crs::WebMercator)?;
                let target = view.container_to_geo(PlanarPoint::new(dx, dy));
                prop_assume!(target.lat.abs() < 84.0 && target.lon.abs() < 180.0);
                let p = project_to_container(target, &view);
                prop_assert!((p.x - dx).abs() < 1e-3, "x {} vs {}", p.x, dx);
                prop_assert!((p.y - dy).abs() < 1e-3, "y {} vs {}", p.y, dy);
            }

            #[test]
            fn test_tile_coords_in_bounds(
                lat in -85.05..85.05_f64,
                lon in -180.0..180.0_f64,
                zoom in 0u8..=18,
            ) {
                let tile = to_tile_coords(GeoPoint::new(lon, lat), zoom, Crs::WebMercator)?;
                let max_tile = 2u32.pow(zoom as u32);
                prop_assert!(tile.row < max_tile);
                prop_assert!(tile.col < max_tile);
            }

            #[test]
            fn test_tile_corner_precedes_point(
                lat in -85.0..85.0_f64,
                lon in -180.0..179.9_f64,
                zoom in 0u8..=18,
            ) {
                let tile = to_tile_coords(GeoPoint::new(lon, lat), zoom, Crs::WebMercator)?;
                let corner = tile_to_geo(&tile, Crs::WebMercator);
                prop_assert!(corner.lon <= lon + 1e-9);
                prop_assert!(corner.lat >= lat - 1e-9);
            }
        }
    }
}
