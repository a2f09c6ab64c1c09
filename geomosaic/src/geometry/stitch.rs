//! Arc stitching.
//!
//! Joins unordered polyline fragments into rings by matching endpoints within
//! [`STITCH_EPSILON`]. Each arc is used at most once. Endpoints are indexed in
//! a quantized grid so every extension step is a constant-time lookup instead
//! of a scan over the remaining pool.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, trace};

use super::types::{GeoArc, GeoPoint, Ring, RingKind};

/// Per-axis tolerance, in degrees, for treating two endpoints as the same vertex.
pub const STITCH_EPSILON: f64 = 1e-7;

/// Result of a stitching pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StitchReport {
    rings: Vec<Ring>,
}

impl StitchReport {
    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }

    pub fn into_rings(self) -> Vec<Ring> {
        self.rings
    }

    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    /// Rings that could not be closed or collapsed onto fewer than three vertices.
    pub fn degenerate_count(&self) -> usize {
        self.rings.iter().filter(|r| r.is_degenerate()).count()
    }

    pub fn closed_count(&self) -> usize {
        self.rings.iter().filter(|r| r.kind() == RingKind::Closed).count()
    }
}

type Cell = (i64, i64);

fn cell_of(p: &GeoPoint) -> Cell {
    (
        (p.lon / STITCH_EPSILON).floor() as i64,
        (p.lat / STITCH_EPSILON).floor() as i64,
    )
}

/// Endpoint lookup over the arc pool.
struct EndpointIndex {
    cells: HashMap<Cell, Vec<usize>>,
}

impl EndpointIndex {
    fn build(arcs: &[GeoArc]) -> Self {
        let mut cells: HashMap<Cell, Vec<usize>> = HashMap::with_capacity(arcs.len() * 2);
        for (idx, arc) in arcs.iter().enumerate() {
            cells.entry(cell_of(&arc.start())).or_default().push(idx);
            let end_cell = cell_of(&arc.end());
            let bucket = cells.entry(end_cell).or_default();
            if bucket.last() != Some(&idx) {
                bucket.push(idx);
            }
        }
        Self { cells }
    }

    /// Lowest-indexed unused arc with an endpoint within tolerance of `p`.
    ///
    /// Returns the arc index and whether the match is at the arc's start.
    fn find(&self, p: &GeoPoint, arcs: &[GeoArc], used: &[bool]) -> Option<(usize, bool)> {
        let (cx, cy) = cell_of(p);
        let mut best: Option<(usize, bool)> = None;

        for dx in -1..=1 {
            for dy in -1..=1 {
                let Some(bucket) = self.cells.get(&(cx + dx, cy + dy)) else {
                    continue;
                };
                for &idx in bucket {
                    if used[idx] || best.is_some_and(|(b, _)| b <= idx) {
                        continue;
                    }
                    let arc = &arcs[idx];
                    if arc.start().coincides_with(p) {
                        best = Some((idx, true));
                    } else if arc.end().coincides_with(p) {
                        best = Some((idx, false));
                    }
                }
            }
        }

        best
    }
}

fn closes(ring: &VecDeque<GeoPoint>) -> bool {
    match (ring.front(), ring.back()) {
        (Some(first), Some(last)) => ring.len() > 2 && first.coincides_with(last),
        _ => false,
    }
}

/// Stitches arcs into rings.
///
/// Rings are seeded from the lowest-indexed unused arc and grown at the tail
/// first, then at the head. Growth stops when the ring closes or no remaining
/// arc touches either end. Arcs that never meet another endpoint come back as
/// [`RingKind::Open`] rings, unchanged; callers decide whether to keep them.
///
/// An empty input yields an empty report.
pub fn stitch(arcs: Vec<GeoArc>) -> StitchReport {
    if arcs.is_empty() {
        return StitchReport::default();
    }

    let index = EndpointIndex::build(&arcs);
    let mut used = vec![false; arcs.len()];
    let mut rings = Vec::new();

    for seed in 0..arcs.len() {
        if used[seed] {
            continue;
        }
        used[seed] = true;

        let mut ring: VecDeque<GeoPoint> = arcs[seed].points().iter().copied().collect();
        let mut joined = 1usize;

        while !closes(&ring) {
            let tail = ring.back().copied();
            let head = ring.front().copied();

            if let Some((idx, at_start)) = tail.and_then(|p| index.find(&p, &arcs, &used)) {
                used[idx] = true;
                joined += 1;
                let pts = arcs[idx].points();
                if at_start {
                    ring.extend(pts[1..].iter().copied());
                } else {
                    ring.extend(pts[..pts.len() - 1].iter().rev().copied());
                }
                continue;
            }

            if let Some((idx, at_start)) = head.and_then(|p| index.find(&p, &arcs, &used)) {
                used[idx] = true;
                joined += 1;
                let pts = arcs[idx].points();
                if at_start {
                    for p in pts[1..].iter() {
                        ring.push_front(*p);
                    }
                } else {
                    for p in pts[..pts.len() - 1].iter().rev() {
                        ring.push_front(*p);
                    }
                }
                continue;
            }

            break;
        }

        let ring = Ring::from_points(ring.into_iter().collect());
        trace!(
            arcs = joined,
            vertices = ring.len(),
            kind = ?ring.kind(),
            "Ring assembled"
        );
        rings.push(ring);
    }

    let report = StitchReport { rings };
    debug!(
        arcs = arcs.len(),
        rings = report.rings.len(),
        degenerate = report.degenerate_count(),
        "Stitching complete"
    );
    report
}
