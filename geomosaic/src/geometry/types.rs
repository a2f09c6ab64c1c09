//! Core geometry types.

use serde::{Deserialize, Serialize};

use super::stitch::STITCH_EPSILON;

/// A geographic position in decimal degrees.
///
/// Serialized as a GeoJSON-style `[lon, lat]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Returns true when both coordinates differ by less than [`STITCH_EPSILON`].
    pub fn coincides_with(&self, other: &GeoPoint) -> bool {
        (self.lon - other.lon).abs() < STITCH_EPSILON && (self.lat - other.lat).abs() < STITCH_EPSILON
    }
}

impl From<[f64; 2]> for GeoPoint {
    fn from(pair: [f64; 2]) -> Self {
        Self::new(pair[0], pair[1])
    }
}

impl From<GeoPoint> for [f64; 2] {
    fn from(point: GeoPoint) -> Self {
        [point.lon, point.lat]
    }
}

/// A position on a pixel plane (container or tile space).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlanarPoint {
    pub x: f64,
    pub y: f64,
}

impl PlanarPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An open polyline segment with at least two vertices.
///
/// Direction carries no meaning; the stitcher may reverse it.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoArc {
    points: Vec<GeoPoint>,
}

impl GeoArc {
    /// Creates an arc, returning `None` for fewer than two vertices.
    pub fn new(points: Vec<GeoPoint>) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        Some(Self { points })
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn start(&self) -> GeoPoint {
        self.points[0]
    }

    pub fn end(&self) -> GeoPoint {
        self.points[self.points.len() - 1]
    }

    pub fn into_points(self) -> Vec<GeoPoint> {
        self.points
    }
}

/// How a stitched ring terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RingKind {
    /// First and last vertex coincide and the ring has at least three distinct vertices.
    Closed,
    /// The ring closes on itself but spans fewer than three distinct vertices.
    Collapsed,
    /// No further arc could be attached and the ends never met.
    Open,
}

/// An ordered vertex sequence produced by the stitcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ring {
    points: Vec<GeoPoint>,
    kind: RingKind,
}

impl Ring {
    /// Builds a ring from raw vertices, classifying it by its endpoints.
    pub fn from_points(points: Vec<GeoPoint>) -> Self {
        let kind = classify(&points);
        Self { points, kind }
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn kind(&self) -> RingKind {
        self.kind
    }

    pub fn is_closed(&self) -> bool {
        self.kind == RingKind::Closed
    }

    /// True for rings that cannot bound a polygon on their own.
    pub fn is_degenerate(&self) -> bool {
        self.kind != RingKind::Closed
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of vertices once the closing duplicate and coincident points are ignored.
    pub fn distinct_vertex_count(&self) -> usize {
        distinct_vertices(&self.points)
    }

    pub fn bounds(&self) -> Option<GeoBounds> {
        GeoBounds::from_points(self.points.iter().copied())
    }

    pub fn into_points(self) -> Vec<GeoPoint> {
        self.points
    }
}

fn classify(points: &[GeoPoint]) -> RingKind {
    let closes = match (points.first(), points.last()) {
        (Some(first), Some(last)) => points.len() > 1 && first.coincides_with(last),
        _ => false,
    };

    if !closes {
        RingKind::Open
    } else if distinct_vertices(points) >= 3 {
        RingKind::Closed
    } else {
        RingKind::Collapsed
    }
}

fn distinct_vertices(points: &[GeoPoint]) -> usize {
    let mut seen: Vec<GeoPoint> = Vec::with_capacity(points.len());
    for point in points {
        if !seen.iter().any(|p| p.coincides_with(point)) {
            seen.push(*point);
        }
    }
    seen.len()
}

/// Axis-aligned geographic bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl GeoBounds {
    /// Computes the bounds of a point set; `None` when the set is empty.
    pub fn from_points(points: impl IntoIterator<Item = GeoPoint>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = GeoBounds {
            west: first.lon,
            south: first.lat,
            east: first.lon,
            north: first.lat,
        };
        for p in iter {
            bounds.extend(p);
        }
        Some(bounds)
    }

    pub fn extend(&mut self, p: GeoPoint) {
        self.west = self.west.min(p.lon);
        self.east = self.east.max(p.lon);
        self.south = self.south.min(p.lat);
        self.north = self.north.max(p.lat);
    }

    pub fn union(self, other: GeoBounds) -> GeoBounds {
        GeoBounds {
            west: self.west.min(other.west),
            south: self.south.min(other.south),
            east: self.east.max(other.east),
            north: self.north.max(other.north),
        }
    }

    pub fn north_west(&self) -> GeoPoint {
        GeoPoint::new(self.west, self.north)
    }

    pub fn south_east(&self) -> GeoPoint {
        GeoPoint::new(self.east, self.south)
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new((self.west + self.east) / 2.0, (self.south + self.north) / 2.0)
    }
}
