//! Geodata query construction.

use crate::feature::{BoundaryFeature, OsmType};
use crate::geometry::GeoPoint;
use crate::roads::RoadFetchOptions;

/// Ref pattern for federal routes (Latin or Cyrillic M, Р, А prefix).
const FEDERAL_REF: &str = "^[MРAМРА]-.*";
/// Ref pattern for regional routes (numeric prefix).
const REGIONAL_REF: &str = "^[0-9].*";

/// Elements by id, with inline geometry.
pub fn boundary_query(ids: &[u64], kind: OsmType) -> String {
    let mut query = String::from("[out:json][timeout:90];(");
    for id in ids {
        query.push_str(&format!("{}({});", kind, id));
    }
    query.push_str(");out geom qt;");
    query
}

/// Administrative relations (levels 4, 5, 6, 8) enclosing a point.
pub fn enclosing_areas_query(p: GeoPoint) -> String {
    format!(
        "[out:json][timeout:90];is_in({},{})->.a;\
         relation(area.a)[\"boundary\"=\"administrative\"][\"admin_level\"~\"^[4568]$\"];\
         out geom qt;",
        p.lat, p.lon
    )
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// How a search area is addressed in a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AreaSelector {
    Id(u64),
    /// Region-level area looked up by exact name.
    Name(String),
}

impl AreaSelector {
    /// Area for a boundary: its element's area id when known, else its name.
    pub fn for_boundary(boundary: &BoundaryFeature) -> Option<Self> {
        if let Some(area) = boundary.source().and_then(|s| s.area_id()) {
            return Some(AreaSelector::Id(area));
        }
        let name = boundary.name().trim();
        if name.is_empty() {
            None
        } else {
            Some(AreaSelector::Name(name.to_string()))
        }
    }

    fn statement(&self) -> String {
        match self {
            AreaSelector::Id(id) => format!("area({})", id),
            AreaSelector::Name(name) => {
                format!("area[\"name\"=\"{}\"][\"admin_level\"~\"^[45]$\"]", escape(name))
            }
        }
    }
}

/// Highway query for one area. `None` when no road class is requested.
pub fn roads_query(area: &AreaSelector, options: RoadFetchOptions) -> Option<String> {
    let filter = match (options.federal, options.regional) {
        (true, true) => "way[\"highway\"~\"^(motorway|trunk)$\"](area.searchArea);\
             way[\"highway\"~\"^(primary|secondary|tertiary)$\"][\"ref\"](area.searchArea);"
            .to_string(),
        (true, false) => format!(
            "way[\"highway\"~\"^(motorway|trunk)$\"](area.searchArea);\
             way[\"highway\"~\"^(primary|secondary)$\"][\"ref\"~\"{}\"](area.searchArea);",
            FEDERAL_REF
        ),
        (false, true) => format!(
            "way[\"highway\"~\"^(primary|secondary|tertiary)$\"][\"ref\"~\"{}\"](area.searchArea);",
            REGIONAL_REF
        ),
        (false, false) => return None,
    };

    Some(format!(
        "[out:json][timeout:120];({};)->.searchArea;({});out geom qt;",
        area.statement(),
        filter
    ))
}

/// City and town relations inside an area.
pub fn settlements_query(area: &AreaSelector) -> String {
    format!(
        "[out:json][timeout:90];({};)->.searchArea;\
         relation[\"place\"~\"^(city|town)$\"](area.searchArea);\
         out geom qt;",
        area.statement()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::OsmRef;
    use std::collections::BTreeMap;

    #[test]
    fn test_boundary_query_lists_ids() {
        assert_eq!(
            boundary_query(&[1, 2], OsmType::Relation),
            "[out:json][timeout:90];(relation(1);relation(2););out geom qt;"
        );
    }

    #[test]
    fn test_enclosing_query() {
        let q = enclosing_areas_query(GeoPoint::new(37.5, 55.25));
        assert!(q.contains("is_in(55.25,37.5)"));
        assert!(q.contains("\"admin_level\"~\"^[4568]$\""));
    }

    #[test]
    fn test_area_selector_prefers_id() {
        let by_id = BoundaryFeature::point(
            "osm-1",
            "Область",
            BTreeMap::new(),
            Some(OsmRef::new(102269, OsmType::Relation)),
            GeoPoint::new(0.0, 0.0),
        );
        assert_eq!(AreaSelector::for_boundary(&by_id), Some(AreaSelector::Id(3_600_102_269)));

        let by_name = BoundaryFeature::point("x", "Край \"N\"", BTreeMap::new(), None, GeoPoint::new(0.0, 0.0));
        let selector = AreaSelector::for_boundary(&by_name).unwrap();
        assert_eq!(
            selector.statement(),
            "area[\"name\"=\"Край \\\"N\\\"\"][\"admin_level\"~\"^[45]$\"]"
        );

        let unnamed = BoundaryFeature::point("x", " ", BTreeMap::new(), None, GeoPoint::new(0.0, 0.0));
        assert_eq!(AreaSelector::for_boundary(&unnamed), None);
    }

    #[test]
    fn test_roads_query_filters() {
        let area = AreaSelector::Id(3_600_000_001);

        let both = roads_query(&area, RoadFetchOptions::new(true, true)).unwrap();
        assert!(both.starts_with("[out:json][timeout:120];(area(3600000001);)->.searchArea;"));
        assert!(both.contains("^(primary|secondary|tertiary)$\"][\"ref\"](area"));

        let federal = roads_query(&area, RoadFetchOptions::new(true, false)).unwrap();
        assert!(federal.contains("^(primary|secondary)$\"][\"ref\"~\"^[MРAМРА]-.*\"]"));
        assert!(!federal.contains("tertiary"));

        let regional = roads_query(&area, RoadFetchOptions::new(false, true)).unwrap();
        assert!(regional.contains("[\"ref\"~\"^[0-9].*\"]"));
        assert!(!regional.contains("motorway"));

        assert!(roads_query(&area, RoadFetchOptions::new(false, false)).is_none());
    }
}
