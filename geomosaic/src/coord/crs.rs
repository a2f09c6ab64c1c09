//! Coordinate reference systems used by tile services.
//!
//! Both systems map longitude linearly; they differ in how latitude is
//! stretched. Positions are expressed as normalized plane coordinates in
//! `[0, 1]`, origin at the north-west corner, so callers scale by the world
//! size of the zoom level they are working at.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use serde::{Deserialize, Serialize};

use super::types::{MAX_LAT, MIN_LAT};
use crate::geometry::GeoPoint;

/// Equatorial radius of the WGS84 ellipsoid, in meters.
const EARTH_RADIUS: f64 = 6_378_137.0;
/// Polar radius of the WGS84 ellipsoid, in meters.
const EARTH_RADIUS_MINOR: f64 = 6_356_752.314_245_179;

const INVERSE_ITERATIONS: usize = 15;
const INVERSE_TOLERANCE: f64 = 1e-7;

/// Projection used to lay geographic positions onto the tile plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Crs {
    /// Spherical Web Mercator (EPSG:3857).
    #[default]
    WebMercator,
    /// Ellipsoidal World Mercator (EPSG:3395).
    WorldMercator,
}

impl Crs {
    /// Projects a position onto the normalized plane.
    pub fn normalize(&self, p: GeoPoint) -> (f64, f64) {
        let lat = p.lat.clamp(MIN_LAT, MAX_LAT);
        let x = (p.lon + 180.0) / 360.0;
        let y = match self {
            Crs::WebMercator => {
                let lat_rad = lat.to_radians();
                (1.0 - lat_rad.tan().asinh() / PI) / 2.0
            }
            Crs::WorldMercator => 0.5 - ellipsoidal_y(lat) / (2.0 * PI * EARTH_RADIUS),
        };
        (x, y)
    }

    /// Inverse of [`Crs::normalize`].
    pub fn denormalize(&self, x: f64, y: f64) -> GeoPoint {
        let lon = x * 360.0 - 180.0;
        let lat = match self {
            Crs::WebMercator => (PI * (1.0 - 2.0 * y)).sinh().atan().to_degrees(),
            Crs::WorldMercator => ellipsoidal_lat((0.5 - y) * 2.0 * PI * EARTH_RADIUS),
        };
        GeoPoint::new(lon, lat)
    }
}

fn eccentricity() -> f64 {
    let ratio = EARTH_RADIUS_MINOR / EARTH_RADIUS;
    (1.0 - ratio * ratio).sqrt()
}

/// Northing in meters on the ellipsoidal Mercator plane.
fn ellipsoidal_y(lat: f64) -> f64 {
    let e = eccentricity();
    let phi = lat.to_radians();
    let con = e * phi.sin();
    let ts = (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - con) / (1.0 + con)).powf(e / 2.0);
    -EARTH_RADIUS * ts.max(1e-10).ln()
}

/// Latitude for a northing in meters, solved iteratively.
fn ellipsoidal_lat(northing: f64) -> f64 {
    let e = eccentricity();
    let ts = (-northing / EARTH_RADIUS).exp();
    let mut phi = FRAC_PI_2 - 2.0 * ts.atan();

    for _ in 0..INVERSE_ITERATIONS {
        let con = e * phi.sin();
        let con = ((1.0 - con) / (1.0 + con)).powf(e / 2.0);
        let dphi = FRAC_PI_2 - 2.0 * (ts * con).atan() - phi;
        phi += dphi;
        if dphi.abs() <= INVERSE_TOLERANCE {
            break;
        }
    }

    phi.to_degrees()
}
