//! Vector overlay rendering
//!
//! Turns features into [`PathPrimitive`]s in container space. Every
//! function here is a pure function of its inputs and the view transform;
//! callers re-render after each view change.
//!
//! Dispatch by geometry:
//!
//! | Geometry | Output |
//! |---|---|
//! | Point | filled circle marker |
//! | LineString, MultiLineString | one open path per line |
//! | Polygon, MultiPolygon | one closed path per ring |
//!
//! Selected regions always get two strokes per ring, a solid halo drawn
//! beneath a dashed line, so they read as highlighted on any basemap.

mod primitive;
mod style;

pub use primitive::{escape_xml, path_data, Fill, Paint, PathPrimitive, Shape, Stroke};
pub use style::{
    resolve_color, BoundaryStyle, LayerStyle, RoadStyle, SettlementStyle, FALLBACK_COLOR, HATCH_PATTERN_ID,
};

use crate::coord::{project_line_to_container, project_to_container, ViewTransform};
use crate::feature::{AnnotationLayer, BoundaryFeature, BoundaryGeometry, Geometry, RoadClass, RoadFeature};
use crate::geometry::{GeoPoint, Ring};

const BOUNDARY_MARKER_RADIUS: f64 = 5.0;

fn ring_path(ring: &Ring, view: &ViewTransform) -> Option<String> {
    let projected = project_line_to_container(ring.points(), view);
    let data = path_data([projected.as_slice()], ring.is_closed());
    (!data.is_empty()).then_some(data)
}

fn line_path(points: &[GeoPoint], view: &ViewTransform, closed: bool) -> Option<String> {
    let projected = project_line_to_container(points, view);
    let data = path_data([projected.as_slice()], closed);
    (!data.is_empty()).then_some(data)
}

/// Renders one selected region.
///
/// Closed rings get a faint fill plus the halo and dashed strokes. Open
/// rings are outlined only.
pub fn render_boundary(feature: &BoundaryFeature, view: &ViewTransform, style: &BoundaryStyle) -> Vec<PathPrimitive> {
    if let BoundaryGeometry::Point(p) = feature.geometry() {
        return vec![PathPrimitive::circle(project_to_container(*p, view), BOUNDARY_MARKER_RADIUS)
            .with_fill(Fill::color(style.line.color.clone(), 1.0))
            .with_stroke(style.halo.clone())];
    }

    let mut out = Vec::new();
    for ring in feature.rings() {
        let Some(data) = ring_path(ring, view) else {
            continue;
        };
        let mut halo = PathPrimitive::path(data.clone()).with_stroke(style.halo.clone());
        if ring.is_closed() {
            halo = halo.with_fill(style.fill.clone());
        }
        out.push(halo);
        out.push(PathPrimitive::path(data).with_stroke(style.line.clone()));
    }
    out
}

pub fn render_boundaries(features: &[BoundaryFeature], view: &ViewTransform, style: &BoundaryStyle) -> Vec<PathPrimitive> {
    features
        .iter()
        .flat_map(|f| render_boundary(f, view, style))
        .collect()
}

/// Renders roads as open paths, regional roads beneath federal ones.
pub fn render_roads(roads: &[RoadFeature], view: &ViewTransform, style: &RoadStyle) -> Vec<PathPrimitive> {
    let mut ordered: Vec<&RoadFeature> = roads.iter().collect();
    ordered.sort_by_key(|r| r.class() == RoadClass::Federal);

    ordered
        .into_iter()
        .filter_map(|road| {
            let data = line_path(road.points(), view, false)?;
            Some(PathPrimitive::path(data).with_stroke(style.stroke(road.class()).clone()))
        })
        .collect()
}

/// Renders settlements, or only the focused city when one is set.
pub fn render_settlements(
    settlements: &[BoundaryFeature],
    focused: Option<&BoundaryFeature>,
    view: &ViewTransform,
    style: &SettlementStyle,
) -> Vec<PathPrimitive> {
    let (features, stroke, fill): (Vec<&BoundaryFeature>, _, _) = match focused {
        Some(city) => (vec![city], &style.focused_stroke, &style.focused_fill),
        None => (settlements.iter().collect(), &style.stroke, &style.fill),
    };

    features
        .into_iter()
        .flat_map(|f| f.rings())
        .filter_map(|ring| {
            let data = ring_path(ring, view)?;
            let mut primitive = PathPrimitive::path(data).with_stroke(stroke.clone());
            if ring.is_closed() {
                primitive = primitive.with_fill(fill.clone());
            }
            Some(primitive)
        })
        .collect()
}

/// Renders an annotation layer, resolving each feature's colour through
/// [`resolve_color`].
pub fn render_layer(layer: &AnnotationLayer, view: &ViewTransform, style: &LayerStyle) -> Vec<PathPrimitive> {
    let mut out = Vec::new();

    for feature in &layer.features.features {
        let Some(geometry) = &feature.geometry else {
            continue;
        };
        let color = resolve_color(feature.color(), layer.color(), style.multi_color);
        let stroke = Stroke::solid(color, style.line_width);
        let marker = |p: &GeoPoint| {
            PathPrimitive::circle(project_to_container(*p, view), style.point_radius)
                .with_fill(Fill::color(style.point_color.clone(), 1.0))
                .with_stroke(Stroke::solid("#ffffff", style.point_outline))
        };
        let polygon = |rings: &Vec<Vec<GeoPoint>>| -> Vec<PathPrimitive> {
            rings
                .iter()
                .filter_map(|ring| line_path(ring, view, true))
                .map(|d| {
                    PathPrimitive::path(d)
                        .with_stroke(stroke.clone())
                        .with_fill(Fill::color(color, style.polygon_fill_opacity))
                })
                .collect()
        };

        match geometry {
            Geometry::Point(p) => out.push(marker(p)),
            Geometry::MultiPoint(points) => out.extend(points.iter().map(marker)),
            Geometry::LineString(line) => {
                out.extend(line_path(line, view, false).map(|d| PathPrimitive::path(d).with_stroke(stroke.clone())))
            }
            Geometry::MultiLineString(lines) => out.extend(
                lines
                    .iter()
                    .filter_map(|l| line_path(l, view, false))
                    .map(|d| PathPrimitive::path(d).with_stroke(stroke.clone())),
            ),
            Geometry::Polygon(rings) => out.extend(polygon(rings)),
            Geometry::MultiPolygon(polys) => out.extend(polys.iter().flat_map(polygon)),
        }
    }

    out
}
