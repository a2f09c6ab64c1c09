//! Boundary acquisition
//!
//! Builds geodata queries, runs them through the [`OverpassClient`] and turns
//! the answers into [`BoundaryFeature`]s (stitching fragmented outer ways
//! into rings) and de-duplicated [`RoadFeature`] lists.
//!
//! [`OverpassClient`]: crate::provider::OverpassClient
//! [`BoundaryFeature`]: crate::feature::BoundaryFeature
//! [`RoadFeature`]: crate::feature::RoadFeature

mod assemble;
mod fetch;
mod query;

pub use assemble::{assemble_boundary, element_arcs, UNNAMED_FEATURE};
pub use fetch::{BoundaryFetcher, DEFAULT_BOUNDARY_TIMEOUT, DEFAULT_ROADS_TIMEOUT};
pub use query::{boundary_query, enclosing_areas_query, roads_query, settlements_query, AreaSelector};
