//! Boundary features.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::osm::OsmRef;
use crate::geometry::{GeoBounds, GeoPoint, Ring};

/// Identity for a feature assembled from one or more element ids.
pub fn osm_identity(ids: &[u64]) -> String {
    let joined = ids.iter().map(u64::to_string).collect::<Vec<_>>().join("-");
    format!("osm-{}", joined)
}

/// Geometry of a boundary.
///
/// Rings keep the kind assigned by the stitcher so that open rings survive a
/// save/load cycle without being silently treated as closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "rings")]
pub enum BoundaryGeometry {
    Polygon(Vec<Ring>),
    /// One single-ring polygon per stitched ring.
    MultiPolygon(Vec<Vec<Ring>>),
    /// Placeholder for selections that resolved to a bare node.
    Point(GeoPoint),
}

/// A named area with stitched geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryFeature {
    id: String,
    name: String,
    #[serde(default)]
    tags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<OsmRef>,
    geometry: BoundaryGeometry,
}

impl BoundaryFeature {
    /// Builds a polygon feature. A single ring becomes a `Polygon`, several
    /// become a `MultiPolygon`; no rings yields `None`.
    pub fn from_rings(
        id: impl Into<String>,
        name: impl Into<String>,
        tags: BTreeMap<String, String>,
        source: Option<OsmRef>,
        mut rings: Vec<Ring>,
    ) -> Option<Self> {
        let geometry = match rings.len() {
            0 => return None,
            1 => BoundaryGeometry::Polygon(vec![rings.remove(0)]),
            _ => BoundaryGeometry::MultiPolygon(rings.into_iter().map(|r| vec![r]).collect()),
        };

        Some(Self {
            id: id.into(),
            name: name.into(),
            tags,
            source,
            geometry,
        })
    }

    pub fn point(
        id: impl Into<String>,
        name: impl Into<String>,
        tags: BTreeMap<String, String>,
        source: Option<OsmRef>,
        location: GeoPoint,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tags,
            source,
            geometry: BoundaryGeometry::Point(location),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn source(&self) -> Option<OsmRef> {
        self.source
    }

    pub fn geometry(&self) -> &BoundaryGeometry {
        &self.geometry
    }

    pub fn is_point(&self) -> bool {
        matches!(self.geometry, BoundaryGeometry::Point(_))
    }

    pub fn admin_level(&self) -> Option<u8> {
        self.tag("admin_level").and_then(|v| v.parse().ok())
    }

    /// All rings, in order, regardless of polygon grouping.
    pub fn rings(&self) -> Box<dyn Iterator<Item = &Ring> + '_> {
        match &self.geometry {
            BoundaryGeometry::Polygon(rings) => Box::new(rings.iter()),
            BoundaryGeometry::MultiPolygon(polys) => Box::new(polys.iter().flatten()),
            BoundaryGeometry::Point(_) => Box::new(std::iter::empty()),
        }
    }

    pub fn bounds(&self) -> Option<GeoBounds> {
        match &self.geometry {
            BoundaryGeometry::Point(p) => GeoBounds::from_points([*p]),
            _ => self
                .rings()
                .filter_map(Ring::bounds)
                .reduce(GeoBounds::union),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::OsmType;

    fn square(offset: f64) -> Ring {
        Ring::from_points(vec![
            GeoPoint::new(offset, 0.0),
            GeoPoint::new(offset + 1.0, 0.0),
            GeoPoint::new(offset + 1.0, 1.0),
            GeoPoint::new(offset, 0.0),
        ])
    }

    #[test]
    fn test_identity_format() {
        assert_eq!(osm_identity(&[1, 22, 333]), "osm-1-22-333");
    }

    #[test]
    fn test_single_ring_is_polygon() {
        let f = BoundaryFeature::from_rings("osm-1", "A", BTreeMap::new(), None, vec![square(0.0)]).unwrap();
        assert!(matches!(f.geometry(), BoundaryGeometry::Polygon(r) if r.len() == 1));
        assert_eq!(f.rings().count(), 1);
    }

    #[test]
    fn test_many_rings_is_multipolygon() {
        let f = BoundaryFeature::from_rings(
            "osm-1",
            "A",
            BTreeMap::new(),
            Some(OsmRef::new(1, OsmType::Relation)),
            vec![square(0.0), square(5.0)],
        )
        .unwrap();
        assert!(matches!(f.geometry(), BoundaryGeometry::MultiPolygon(p) if p.len() == 2));
        let bounds = f.bounds().unwrap();
        assert_eq!(bounds.west, 0.0);
        assert_eq!(bounds.east, 6.0);
    }

    #[test]
    fn test_no_rings_is_none() {
        assert!(BoundaryFeature::from_rings("x", "x", BTreeMap::new(), None, Vec::new()).is_none());
    }

    #[test]
    fn test_admin_level() {
        let mut tags = BTreeMap::new();
        tags.insert("admin_level".to_string(), "4".to_string());
        let f = BoundaryFeature::point("p", "P", tags, None, GeoPoint::new(1.0, 2.0));
        assert_eq!(f.admin_level(), Some(4));
        assert!(f.is_point());
        assert_eq!(f.rings().count(), 0);
    }

    #[test]
    fn test_serde_roundtrip_keeps_ring_kind() {
        let open = Ring::from_points(vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 1.0)]);
        let f = BoundaryFeature::from_rings("osm-9", "B", BTreeMap::new(), None, vec![open]).unwrap();
        let json = serde_json::to_string(&f).unwrap();
        let back: BoundaryFeature = serde_json::from_str(&json).unwrap();
        assert_eq!(back, f);
        assert!(back.rings().next().unwrap().is_degenerate());
    }
}
