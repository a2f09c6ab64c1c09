//! Road de-duplication.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::feature::RoadFeature;
use crate::geometry::GeoPoint;

/// A highway way as delivered by the geodata service, before classification.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRoadWay {
    pub way_id: Option<u64>,
    pub tags: BTreeMap<String, String>,
    pub points: Vec<GeoPoint>,
}

/// Merges per-target road results into one list.
///
/// Identity is the way id when present, else a hash of the geometry. The
/// first occurrence wins and keeps its position; each unique road is
/// classified exactly once. Ways with unusable geometry are dropped.
pub fn dedupe<I>(per_target: I) -> Vec<RoadFeature>
where
    I: IntoIterator,
    I::Item: IntoIterator<Item = RawRoadWay>,
{
    let mut seen = HashSet::new();
    let mut roads = Vec::new();
    let mut duplicates = 0usize;

    for target in per_target {
        for way in target {
            let Some(road) = RoadFeature::from_way(way.way_id, way.tags, way.points) else {
                continue;
            };
            if seen.insert(road.id().clone()) {
                roads.push(road);
            } else {
                duplicates += 1;
            }
        }
    }

    debug!(unique = roads.len(), duplicates, "Roads de-duplicated");
    roads
}
