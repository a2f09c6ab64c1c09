//! Tile fetching and compositing onto the export surface.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::future::join_all;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use thiserror::Error;
use tiny_skia::{Color, FilterQuality, IntSize, Pixmap, PixmapPaint, Transform};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use super::cache::TileCache;
use super::{plan_mosaic, MosaicRequest, TilePlacement, TILE_OVERLAP_PX};
use crate::provider::{AsyncHttpClient, MapStyle, TileSource};

/// Default per-tile patience.
pub const DEFAULT_TILE_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MosaicError {
    #[error("mosaic cancelled")]
    Cancelled,

    #[error("cannot allocate a {width}x{height} surface")]
    Surface { width: u32, height: u32 },

    #[error("a {width}x{height} viewport at supersample {supersample} exceeds the surface size limit")]
    Oversized { width: u32, height: u32, supersample: u32 },

    #[error("JPEG encoding failed: {0}")]
    Encode(String),
}

/// Outcome counters for one build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MosaicStats {
    pub requested: usize,
    pub drawn: usize,
    pub failed: usize,
    pub cached: usize,
}

/// A composed raster surface.
pub struct Mosaic {
    surface: Pixmap,
    stats: MosaicStats,
}

impl Mosaic {
    pub fn width(&self) -> u32 {
        self.surface.width()
    }

    pub fn height(&self) -> u32 {
        self.surface.height()
    }

    pub fn stats(&self) -> MosaicStats {
        self.stats
    }

    pub fn surface(&self) -> &Pixmap {
        &self.surface
    }

    /// Encodes the surface as baseline JPEG at `quality` (1-100).
    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>, MosaicError> {
        let mut rgb = RgbImage::new(self.surface.width(), self.surface.height());
        for (dst, src) in rgb.pixels_mut().zip(self.surface.pixels()) {
            let c = src.demultiply();
            *dst = image::Rgb([c.red(), c.green(), c.blue()]);
        }

        let mut out = Cursor::new(Vec::new());
        JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
            .encode_image(&rgb)
            .map_err(|e| MosaicError::Encode(e.to_string()))?;
        Ok(out.into_inner())
    }
}

/// Decodes a tile image into a premultiplied pixmap.
fn decode_tile(data: &[u8]) -> Option<Pixmap> {
    let rgba = image::load_from_memory(data).ok()?.to_rgba8();
    let (w, h) = rgba.dimensions();
    let mut raw = rgba.into_raw();
    for px in raw.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a < 255 {
            for c in &mut px[..3] {
                *c = ((*c as u16 * a + 127) / 255) as u8;
            }
        }
    }
    Pixmap::from_vec(raw, IntSize::from_wh(w, h)?)
}

/// Replaces every pixel with its difference against opaque white.
fn invert(surface: &mut Pixmap) {
    for px in surface.data_mut().chunks_exact_mut(4) {
        let a = px[3];
        for c in &mut px[..3] {
            *c = a.saturating_sub(*c);
        }
    }
}

/// Fetches tiles and composes them into a [`Mosaic`].
pub struct MosaicBuilder<C> {
    http: C,
    cache: Option<Arc<TileCache>>,
    tile_timeout: Duration,
}

impl<C: AsyncHttpClient> MosaicBuilder<C> {
    pub fn new(http: C) -> Self {
        Self {
            http,
            cache: None,
            tile_timeout: DEFAULT_TILE_TIMEOUT,
        }
    }

    pub fn with_cache(mut self, cache: Arc<TileCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_tile_timeout(mut self, timeout: Duration) -> Self {
        self.tile_timeout = timeout;
        self
    }

    async fn fetch_tile(&self, url: String) -> (Option<Bytes>, bool) {
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&url).await {
                return (Some(hit), true);
            }
        }

        let result = tokio::time::timeout(self.tile_timeout, self.http.get(&url, self.tile_timeout)).await;
        match result {
            Ok(Ok(body)) => {
                let body = Bytes::from(body);
                if let Some(cache) = &self.cache {
                    cache.insert(url, body.clone()).await;
                }
                (Some(body), false)
            }
            Ok(Err(e)) => {
                debug!(url = %url, error = %e, "Tile fetch failed");
                (None, false)
            }
            Err(_) => {
                debug!(url = %url, "Tile fetch timed out");
                (None, false)
            }
        }
    }

    /// Fetches every tile of the plan concurrently and draws the survivors.
    ///
    /// Individual tile failures are tolerated. Cancellation aborts all
    /// outstanding fetches and yields [`MosaicError::Cancelled`].
    pub async fn build(
        &self,
        source: &TileSource,
        style: MapStyle,
        request: &MosaicRequest,
        cancel: &CancellationToken,
    ) -> Result<Mosaic, MosaicError> {
        let plan = plan_mosaic(request, source.max_zoom())?;
        let mut surface = Pixmap::new(plan.surface_width, plan.surface_height).ok_or(MosaicError::Surface {
            width: plan.surface_width,
            height: plan.surface_height,
        })?;
        surface.fill(Color::WHITE);

        debug!(
            zoom = plan.export_zoom,
            tiles = plan.placements.len(),
            width = plan.surface_width,
            height = plan.surface_height,
            "Building mosaic"
        );

        let fetches = plan
            .placements
            .iter()
            .map(|placement| self.fetch_tile(source.url(&placement.tile)));

        let results = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(MosaicError::Cancelled),
            results = join_all(fetches) => results,
        };

        let mut stats = MosaicStats {
            requested: plan.placements.len(),
            ..Default::default()
        };

        for (placement, (body, cached)) in plan.placements.iter().zip(results) {
            if cached {
                stats.cached += 1;
            }
            match body.as_deref().and_then(decode_tile) {
                Some(tile) => {
                    draw_tile(&mut surface, &tile, placement);
                    stats.drawn += 1;
                }
                None => stats.failed += 1,
            }
        }

        if style.inverts_raster() {
            invert(&mut surface);
        }

        info!(
            requested = stats.requested,
            drawn = stats.drawn,
            failed = stats.failed,
            cached = stats.cached,
            "Mosaic composed"
        );
        Ok(Mosaic { surface, stats })
    }
}

fn draw_tile(surface: &mut Pixmap, tile: &Pixmap, placement: &TilePlacement) {
    let sx = (placement.width + TILE_OVERLAP_PX) / tile.width() as f64;
    let sy = (placement.height + TILE_OVERLAP_PX) / tile.height() as f64;
    trace!(tile = %placement.tile, x = placement.x, y = placement.y, "Drawing tile");

    surface.draw_pixmap(
        0,
        0,
        tile.as_ref(),
        &PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        },
        Transform::from_row(
            sx as f32,
            0.0,
            0.0,
            sy as f32,
            placement.x as f32,
            placement.y as f32,
        ),
        None,
    );
}
