//! Raster mosaic assembly
//!
//! Exports carry a basemap rendered at a higher resolution than the live
//! view. The live zoom is raised by a zoom offset, every tile covering the
//! visible area is fetched at that zoom, and each tile is scaled into a
//! surface `supersample` times larger than the viewport.
//!
//! Placement is computed in tile space (world pixels at the export zoom) and
//! mapped linearly onto the surface, so the mosaic lines up with vectors
//! drawn in container space at the live zoom.
//!
//! Failed tiles are skipped; the surface background shows through. Draws are
//! padded by [`TILE_OVERLAP_PX`] to hide hairline seams from rounding.

mod builder;
mod cache;

pub use builder::{Mosaic, MosaicBuilder, MosaicError, MosaicStats, DEFAULT_TILE_TIMEOUT};
pub use cache::{TileCache, TileCacheStats};

use crate::coord::{project_to_tile_space, TileCoord, TileRange, ViewTransform, Viewport};
use crate::geometry::PlanarPoint;

pub const DEFAULT_SUPERSAMPLE: u32 = 4;
pub const MAX_SUPERSAMPLE: u32 = 8;
pub const DEFAULT_ZOOM_OFFSET: u8 = 2;
pub const DEFAULT_JPEG_QUALITY: u8 = 85;
/// Extra pixels added to each tile draw to cover seams.
pub const TILE_OVERLAP_PX: f64 = 1.0;

/// What to render: a frozen view and the output scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MosaicRequest {
    pub view: ViewTransform,
    pub viewport: Viewport,
    pub supersample: u32,
    pub zoom_offset: u8,
}

impl MosaicRequest {
    pub fn new(view: ViewTransform, viewport: Viewport) -> Self {
        Self {
            view,
            viewport,
            supersample: DEFAULT_SUPERSAMPLE,
            zoom_offset: DEFAULT_ZOOM_OFFSET,
        }
    }

    pub fn with_supersample(mut self, supersample: u32) -> Self {
        self.supersample = supersample.clamp(1, MAX_SUPERSAMPLE);
        self
    }

    pub fn with_zoom_offset(mut self, zoom_offset: u8) -> Self {
        self.zoom_offset = zoom_offset;
        self
    }
}

/// Destination of one tile on the output surface, in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TilePlacement {
    pub tile: TileCoord,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Tiles to fetch and where each one goes.
#[derive(Debug, Clone, PartialEq)]
pub struct MosaicPlan {
    pub export_zoom: u8,
    pub surface_width: u32,
    pub surface_height: u32,
    pub range: Option<TileRange>,
    pub placements: Vec<TilePlacement>,
}

/// Computes the tile grid and placements for a request.
///
/// The export zoom is the live zoom plus the offset, capped at `max_zoom`.
/// When the viewport has no area the plan has no placements. A surface whose
/// size does not fit in `u32` is rejected.
pub fn plan_mosaic(request: &MosaicRequest, max_zoom: u8) -> Result<MosaicPlan, MosaicError> {
    let view = &request.view;
    let export_zoom = view.zoom().saturating_add(request.zoom_offset).min(max_zoom);
    let scaled = |side: u32| side.checked_mul(request.supersample);
    let (Some(surface_width), Some(surface_height)) = (scaled(request.viewport.width), scaled(request.viewport.height))
    else {
        return Err(MosaicError::Oversized {
            width: request.viewport.width,
            height: request.viewport.height,
            supersample: request.supersample,
        });
    };

    let nw = project_to_tile_space(view.origin(), view, export_zoom);
    let se_geo = view.container_to_geo(PlanarPoint::new(
        request.viewport.width as f64,
        request.viewport.height as f64,
    ));
    let se = project_to_tile_space(se_geo, view, export_zoom);

    let total_w = se.x - nw.x;
    let total_h = se.y - nw.y;
    let range = TileRange::covering(nw, se, view.tile_size(), export_zoom);

    let ts = view.tile_size() as f64;
    let placements = match range {
        Some(range) if surface_width > 0 && surface_height > 0 => range
            .iter()
            .map(|tile| TilePlacement {
                tile,
                x: ((tile.col as f64 * ts - nw.x) / total_w) * surface_width as f64,
                y: ((tile.row as f64 * ts - nw.y) / total_h) * surface_height as f64,
                width: (ts / total_w) * surface_width as f64,
                height: (ts / total_h) * surface_height as f64,
            })
            .collect(),
        _ => Vec::new(),
    };

    Ok(MosaicPlan {
        export_zoom,
        surface_width,
        surface_height,
        range,
        placements,
    })
}
