//! Road features and classification.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::geometry::{GeoPoint, STITCH_EPSILON};

/// Display name for roads carrying neither a name nor a ref.
pub const UNNAMED_ROAD: &str = "Трасса";

/// Federal route refs start with M, Р or А (Latin or Cyrillic) and a dash.
fn federal_ref_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[MРAМРА]-").unwrap())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoadClass {
    Federal,
    Regional,
}

impl fmt::Display for RoadClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoadClass::Federal => f.write_str("federal"),
            RoadClass::Regional => f.write_str("regional"),
        }
    }
}

/// Classifies a road from its tags.
///
/// Federal when the ref matches the federal route pattern or the highway is
/// a motorway or trunk; regional otherwise.
pub fn classify_road(tags: &BTreeMap<String, String>) -> RoadClass {
    let federal_ref = tags
        .get("ref")
        .is_some_and(|r| federal_ref_pattern().is_match(r));
    let major_highway = matches!(
        tags.get("highway").map(String::as_str),
        Some("motorway") | Some("trunk")
    );

    if federal_ref || major_highway {
        RoadClass::Federal
    } else {
        RoadClass::Regional
    }
}

/// Stable road identity used for de-duplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoadId {
    /// Source way id.
    Way(u64),
    /// Hash of the quantized vertex sequence, for ways delivered without an id.
    Geometry(String),
}

impl RoadId {
    fn from_geometry(points: &[GeoPoint]) -> Self {
        let mut hasher = Sha256::new();
        for p in points {
            hasher.update(((p.lon / STITCH_EPSILON).round() as i64).to_le_bytes());
            hasher.update(((p.lat / STITCH_EPSILON).round() as i64).to_le_bytes());
        }
        let digest = hasher.finalize();
        let hex = digest[..8].iter().map(|b| format!("{:02x}", b)).collect::<String>();
        RoadId::Geometry(hex)
    }
}

impl fmt::Display for RoadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoadId::Way(id) => write!(f, "way/{}", id),
            RoadId::Geometry(hash) => write!(f, "geom/{}", hash),
        }
    }
}

/// A classified road polyline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadFeature {
    id: RoadId,
    name: String,
    class: RoadClass,
    #[serde(default)]
    tags: BTreeMap<String, String>,
    points: Vec<GeoPoint>,
}

impl RoadFeature {
    /// Builds a road from a way. Returns `None` for geometry with fewer
    /// than two vertices.
    pub fn from_way(way_id: Option<u64>, tags: BTreeMap<String, String>, points: Vec<GeoPoint>) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }

        let id = match way_id {
            Some(id) => RoadId::Way(id),
            None => RoadId::from_geometry(&points),
        };
        let name = tags
            .get("name")
            .or_else(|| tags.get("ref"))
            .cloned()
            .unwrap_or_else(|| UNNAMED_ROAD.to_string());
        let class = classify_road(&tags);

        Some(Self {
            id,
            name,
            class,
            tags,
            points,
        })
    }

    pub fn id(&self) -> &RoadId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> RoadClass {
        self.class
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn line() -> Vec<GeoPoint> {
        vec![GeoPoint::new(37.0, 55.0), GeoPoint::new(37.1, 55.1)]
    }

    #[test]
    fn test_motorway_without_ref_is_federal() {
        assert_eq!(classify_road(&tags(&[("highway", "motorway")])), RoadClass::Federal);
        assert_eq!(classify_road(&tags(&[("highway", "trunk")])), RoadClass::Federal);
    }

    #[test]
    fn test_federal_ref_prefixes() {
        for r in ["M-4", "Р-22", "А-108", "A-290", "М-11"] {
            assert_eq!(
                classify_road(&tags(&[("highway", "primary"), ("ref", r)])),
                RoadClass::Federal,
                "ref {}",
                r
            );
        }
    }

    #[test]
    fn test_latin_p_ref_is_regional() {
        assert_eq!(
            classify_road(&tags(&[("highway", "secondary"), ("ref", "P-22")])),
            RoadClass::Regional
        );
        assert_eq!(
            classify_road(&tags(&[("highway", "tertiary"), ("ref", "46К-1120")])),
            RoadClass::Regional
        );
    }

    #[test]
    fn test_name_fallbacks() {
        let named = RoadFeature::from_way(Some(1), tags(&[("name", "Ring"), ("ref", "M-1")]), line()).unwrap();
        assert_eq!(named.name(), "Ring");

        let by_ref = RoadFeature::from_way(Some(2), tags(&[("ref", "M-1")]), line()).unwrap();
        assert_eq!(by_ref.name(), "M-1");

        let bare = RoadFeature::from_way(Some(3), BTreeMap::new(), line()).unwrap();
        assert_eq!(bare.name(), UNNAMED_ROAD);
    }

    #[test]
    fn test_geometry_identity_is_stable() {
        let a = RoadFeature::from_way(None, BTreeMap::new(), line()).unwrap();
        let b = RoadFeature::from_way(None, tags(&[("highway", "primary")]), line()).unwrap();
        assert_eq!(a.id(), b.id());
        assert!(matches!(a.id(), RoadId::Geometry(h) if h.len() == 16));

        let mut other = line();
        other.push(GeoPoint::new(37.2, 55.2));
        let c = RoadFeature::from_way(None, BTreeMap::new(), other).unwrap();
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn test_short_geometry_rejected() {
        assert!(RoadFeature::from_way(Some(1), BTreeMap::new(), vec![GeoPoint::new(0.0, 0.0)]).is_none());
    }
}
