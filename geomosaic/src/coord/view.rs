//! View transforms.
//!
//! A [`ViewTransform`] pins the north-west corner of the visible area to a
//! geographic position at a given zoom. It is `Copy`, so taking a snapshot
//! for an export is a plain assignment and can never observe later pans.

use super::crs::Crs;
use super::types::{CoordError, MAX_LAT, MAX_ZOOM, MIN_LAT};
use super::{unproject_world_pixel, world_pixel};
use crate::geometry::{GeoBounds, GeoPoint, PlanarPoint};

/// Default raster tile edge, in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Size of the output container in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Mapping from geographic positions to container pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    origin: GeoPoint,
    zoom: u8,
    tile_size: u32,
    crs: Crs,
}

impl ViewTransform {
    /// Creates a transform whose container origin sits at `origin`.
    pub fn new(origin: GeoPoint, zoom: u8, tile_size: u32, crs: Crs) -> Result<Self, CoordError> {
        validate(origin, zoom)?;
        Ok(Self {
            origin,
            zoom,
            tile_size,
            crs,
        })
    }

    /// Creates a transform that places `center` in the middle of `viewport`.
    pub fn centered(
        center: GeoPoint,
        zoom: u8,
        viewport: Viewport,
        tile_size: u32,
        crs: Crs,
    ) -> Result<Self, CoordError> {
        validate(center, zoom)?;
        let mid = world_pixel(center, zoom, tile_size, crs);
        let corner = PlanarPoint::new(
            mid.x - viewport.width as f64 / 2.0,
            mid.y - viewport.height as f64 / 2.0,
        );
        let origin = unproject_world_pixel(corner, zoom, tile_size, crs);
        Ok(Self {
            origin,
            zoom,
            tile_size,
            crs,
        })
    }

    /// Highest-zoom transform that shows all of `bounds` inside `viewport`
    /// with `padding` pixels to spare on every side.
    pub fn fit(
        bounds: GeoBounds,
        viewport: Viewport,
        padding: u32,
        max_zoom: u8,
        tile_size: u32,
        crs: Crs,
    ) -> Result<Self, CoordError> {
        let avail_w = viewport.width.saturating_sub(padding * 2).max(1) as f64;
        let avail_h = viewport.height.saturating_sub(padding * 2).max(1) as f64;

        let mut zoom = max_zoom.min(MAX_ZOOM);
        while zoom > 0 {
            let nw = world_pixel(bounds.north_west(), zoom, tile_size, crs);
            let se = world_pixel(bounds.south_east(), zoom, tile_size, crs);
            if se.x - nw.x <= avail_w && se.y - nw.y <= avail_h {
                break;
            }
            zoom -= 1;
        }

        Self::centered(bounds.center(), zoom, viewport, tile_size, crs)
    }

    pub fn origin(&self) -> GeoPoint {
        self.origin
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    /// World-pixel position of the container origin at this transform's zoom.
    pub fn origin_pixel(&self) -> PlanarPoint {
        world_pixel(self.origin, self.zoom, self.tile_size, self.crs)
    }

    /// Geographic position under a container pixel.
    pub fn container_to_geo(&self, p: PlanarPoint) -> GeoPoint {
        let origin = self.origin_pixel();
        unproject_world_pixel(
            PlanarPoint::new(origin.x + p.x, origin.y + p.y),
            self.zoom,
            self.tile_size,
            self.crs,
        )
    }

    /// Geographic position of the viewport's centre.
    pub fn center(&self, viewport: Viewport) -> GeoPoint {
        self.container_to_geo(PlanarPoint::new(
            viewport.width as f64 / 2.0,
            viewport.height as f64 / 2.0,
        ))
    }

    /// Same centre, different projection. Used when switching map styles.
    pub fn with_crs(&self, crs: Crs, viewport: Viewport) -> Self {
        if crs == self.crs {
            return *self;
        }
        let center = self.center(viewport);
        let mid = world_pixel(center, self.zoom, self.tile_size, crs);
        let corner = PlanarPoint::new(
            mid.x - viewport.width as f64 / 2.0,
            mid.y - viewport.height as f64 / 2.0,
        );
        Self {
            origin: unproject_world_pixel(corner, self.zoom, self.tile_size, crs),
            crs,
            ..*self
        }
    }
}

fn validate(p: GeoPoint, zoom: u8) -> Result<(), CoordError> {
    if !(MIN_LAT..=MAX_LAT).contains(&p.lat) {
        return Err(CoordError::InvalidLatitude(p.lat));
    }
    if !(-180.0..=180.0).contains(&p.lon) {
        return Err(CoordError::InvalidLongitude(p.lon));
    }
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::project_to_container;

    #[test]
    fn test_centered_puts_center_mid_viewport() {
        let viewport = Viewport::new(800, 600);
        let center = GeoPoint::new(37.62, 55.75);
        let view = ViewTransform::centered(center, 10, viewport, 256, Crs::WebMercator).unwrap();

        let p = project_to_container(center, &view);
        assert!((p.x - 400.0).abs() < 1e-6);
        assert!((p.y - 300.0).abs() < 1e-6);

        let back = view.center(viewport);
        assert!((back.lon - center.lon).abs() < 1e-9);
        assert!((back.lat - center.lat).abs() < 1e-9);
    }

    #[test]
    fn test_new_rejects_bad_inputs() {
        assert!(matches!(
            ViewTransform::new(GeoPoint::new(0.0, 89.0), 5, 256, Crs::WebMercator),
            Err(CoordError::InvalidLatitude(_))
        ));
        assert!(matches!(
            ViewTransform::new(GeoPoint::new(181.0, 0.0), 5, 256, Crs::WebMercator),
            Err(CoordError::InvalidLongitude(_))
        ));
        assert!(matches!(
            ViewTransform::new(GeoPoint::new(0.0, 0.0), 40, 256, Crs::WebMercator),
            Err(CoordError::InvalidZoom(40))
        ));
    }

    #[test]
    fn test_fit_contains_bounds() {
        let bounds = GeoBounds {
            west: 36.8,
            south: 55.1,
            east: 38.2,
            north: 56.1,
        };
        let viewport = Viewport::new(1024, 768);
        let view = ViewTransform::fit(bounds, viewport, 20, 18, 256, Crs::WebMercator).unwrap();

        let nw = project_to_container(bounds.north_west(), &view);
        let se = project_to_container(bounds.south_east(), &view);
        assert!(nw.x >= 0.0 && nw.y >= 0.0);
        assert!(se.x <= 1024.0 && se.y <= 768.0);

        // One zoom deeper would overflow the viewport.
        let deeper = ViewTransform::centered(bounds.center(), view.zoom() + 1, viewport, 256, Crs::WebMercator)
            .unwrap();
        let nw = project_to_container(bounds.north_west(), &deeper);
        let se = project_to_container(bounds.south_east(), &deeper);
        assert!(se.x - nw.x > 984.0 || se.y - nw.y > 728.0);
    }

    #[test]
    fn test_with_crs_keeps_center() {
        let viewport = Viewport::new(640, 480);
        let center = GeoPoint::new(30.3, 59.9);
        let view = ViewTransform::centered(center, 9, viewport, 256, Crs::WebMercator).unwrap();
        let switched = view.with_crs(Crs::WorldMercator, viewport);

        assert_eq!(switched.crs(), Crs::WorldMercator);
        let back = switched.center(viewport);
        assert!((back.lat - center.lat).abs() < 1e-6);
        assert!((back.lon - center.lon).abs() < 1e-6);
    }
}
