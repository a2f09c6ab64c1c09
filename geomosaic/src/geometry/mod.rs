//! Geometric primitives and ring reconstruction.
//!
//! Geographic data arrives from the geodata query service as unordered,
//! possibly fragmented polylines ([`GeoArc`]). The [`stitch`] pass joins them
//! at matching endpoints into [`Ring`]s that bound boundary polygons.
//!
//! # Example
//!
//! ```
//! use geomosaic::geometry::{stitch, GeoArc, GeoPoint, RingKind};
//!
//! let arcs = vec![
//!     GeoArc::new(vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 0.0)]).unwrap(),
//!     GeoArc::new(vec![GeoPoint::new(1.0, 0.0), GeoPoint::new(1.0, 1.0)]).unwrap(),
//!     GeoArc::new(vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 1.0)]).unwrap(),
//! ];
//!
//! let report = stitch(arcs);
//! assert_eq!(report.rings().len(), 1);
//! assert_eq!(report.rings()[0].kind(), RingKind::Closed);
//! ```

mod stitch;
mod types;

pub use stitch::{stitch, StitchReport, STITCH_EPSILON};
pub use types::{GeoArc, GeoBounds, GeoPoint, PlanarPoint, Ring, RingKind};
