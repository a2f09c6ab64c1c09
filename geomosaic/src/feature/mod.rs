//! Feature model.
//!
//! Three families of features flow through the compositor:
//!
//! - [`BoundaryFeature`]: administrative areas and settlements, built from
//!   stitched rings.
//! - [`RoadFeature`]: classified highway polylines.
//! - [`AnnotationLayer`]: user-imported GeoJSON overlays.

mod annotation;
mod boundary;
mod osm;
mod road;

pub use annotation::{AnnotationLayer, Feature, FeatureCollection, Geometry};
pub use boundary::{osm_identity, BoundaryFeature, BoundaryGeometry};
pub use osm::{OsmRef, OsmType};
pub use road::{classify_road, RoadClass, RoadFeature, RoadId, UNNAMED_ROAD};
