//! Geomosaic - boundary synthesis and cartographic compositing
//!
//! Turns OpenStreetMap administrative boundaries, road networks and user
//! annotation layers into a single composed map: vectors are stitched into
//! rings, projected onto a viewport, clipped and masked against the selected
//! regions, and laid over a stitched raster basemap. The result is shown as a
//! live overlay or exported as a self-contained SVG document.
//!
//! The main entry point is [`session::CompositingSession`]; the lower-level
//! modules can be used on their own.

pub mod boundary;
pub mod config;
pub mod coord;
pub mod export;
pub mod feature;
pub mod geometry;
pub mod logging;
pub mod mask;
pub mod mosaic;
pub mod project;
pub mod provider;
pub mod render;
pub mod roads;
pub mod session;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
