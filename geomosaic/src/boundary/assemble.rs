//! Boundary assembly from geodata elements.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::feature::{osm_identity, BoundaryFeature, OsmRef, OsmType};
use crate::geometry::{stitch, GeoArc, GeoPoint, RingKind};
use crate::provider::{Element, LatLon};

/// Name given to features whose tags carry none.
pub const UNNAMED_FEATURE: &str = "Объект";

fn display_name(tags: &BTreeMap<String, String>) -> String {
    ["name", "name:ru", "official_name"]
        .iter()
        .find_map(|key| tags.get(*key).filter(|v| !v.is_empty()))
        .cloned()
        .unwrap_or_else(|| UNNAMED_FEATURE.to_string())
}

fn arc_from(geometry: &[LatLon]) -> Option<GeoArc> {
    GeoArc::new(geometry.iter().copied().map(GeoPoint::from).collect())
}

/// Outer-boundary arcs carried by an element.
///
/// Ways contribute their own geometry. Relations contribute way members whose
/// role is `outer` or empty; inner rings and other roles are ignored.
pub fn element_arcs(element: &Element) -> Vec<GeoArc> {
    match element {
        Element::Way {
            geometry: Some(geometry),
            ..
        } => arc_from(geometry).into_iter().collect(),
        Element::Relation { members, .. } => members
            .iter()
            .filter(|m| m.kind == "way" && (m.role == "outer" || m.role.is_empty()))
            .filter_map(|m| m.geometry.as_deref().and_then(arc_from))
            .collect(),
        _ => Vec::new(),
    }
}

fn element_ref(element: &Element) -> Option<OsmRef> {
    let kind = match element {
        Element::Node { .. } => OsmType::Node,
        Element::Way { .. } => OsmType::Way,
        Element::Relation { .. } => OsmType::Relation,
        Element::Other => return None,
    };
    element.id().map(|id| OsmRef::new(id, kind))
}

/// Builds a boundary feature from a query response.
///
/// The name comes from the first element; tags of all elements are merged,
/// later elements overriding earlier ones. Rings that collapse onto fewer
/// than three vertices are discarded; open rings are kept and logged.
///
/// A response holding only a node with no way geometry yields a point
/// feature. Returns `None` when there is nothing to draw.
pub fn assemble_boundary(elements: &[Element], ids: &[u64]) -> Option<BoundaryFeature> {
    let first = elements.first()?;
    let name = display_name(first.tags()?);

    let mut tags = BTreeMap::new();
    let mut arcs = Vec::new();
    for element in elements {
        if let Some(t) = element.tags() {
            tags.extend(t.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        arcs.extend(element_arcs(element));
    }

    let identity = osm_identity(ids);
    let source = element_ref(first);

    if arcs.is_empty() {
        if let Element::Node { lat, lon, .. } = first {
            debug!(id = %identity, "Selection resolved to a bare node");
            return Some(BoundaryFeature::point(
                identity,
                name,
                tags,
                source,
                GeoPoint::new(*lon, *lat),
            ));
        }
        return None;
    }

    let report = stitch(arcs);
    let open = report.rings().iter().filter(|r| r.kind() == RingKind::Open).count();
    if open > 0 {
        warn!(id = %identity, name = %name, open, "Boundary has rings that do not close");
    }

    let rings: Vec<_> = report
        .into_rings()
        .into_iter()
        .filter(|r| r.kind() != RingKind::Collapsed)
        .collect();

    debug!(id = %identity, name = %name, rings = rings.len(), "Boundary assembled");
    BoundaryFeature::from_rings(identity, name, tags, source, rings)
}
