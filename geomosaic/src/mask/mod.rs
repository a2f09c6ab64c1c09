//! Clip and dim-mask synthesis
//!
//! Both artifacts are derived from the closed rings of the active regions,
//! projected into container space:
//!
//! - [`ClipRegion`]: the union of all rings. Roads and settlements are
//!   clipped to it so nothing is drawn outside the selection.
//! - [`DimMask`]: a full-viewport mask with every ring cut out. An overlay
//!   drawn through it darkens everything outside the selection.
//!
//! Neither is patched incrementally. [`MaskCache`] rebuilds both whenever
//! the view, the viewport or the region set changes. With no rings the clip
//! is the identity and the mask is inert.

use std::sync::Arc;

use tracing::debug;

use crate::coord::{project_line_to_container, ViewTransform, Viewport};
use crate::feature::BoundaryFeature;
use crate::render::path_data;

/// Id of the boundary `<clipPath>` definition.
pub const CLIP_PATH_ID: &str = "boundary-clip";
/// Id of the luminance `<mask>` definition.
pub const DIM_MASK_ID: &str = "dim-mask";
/// Opacity of the darkening overlay outside the selection.
pub const DIM_OPACITY: f64 = 0.5;

/// Union of projected region rings, one path per ring.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClipRegion {
    paths: Vec<String>,
}

impl ClipRegion {
    /// True when nothing is clipped away.
    pub fn is_identity(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }
}

/// Full-viewport mask with the region rings cut out.
#[derive(Debug, Clone, PartialEq)]
pub struct DimMask {
    viewport: Viewport,
    cutouts: Vec<String>,
}

impl DimMask {
    /// True when applying the mask would not darken anything.
    pub fn is_inert(&self) -> bool {
        self.cutouts.is_empty()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn cutouts(&self) -> &[String] {
        &self.cutouts
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaskSet {
    pub clip: ClipRegion,
    pub dim: DimMask,
}

/// Projects every closed ring of `boundaries` and builds the clip and mask.
///
/// Open rings and point features contribute nothing: they enclose no area.
pub fn synthesize(boundaries: &[BoundaryFeature], view: &ViewTransform, viewport: Viewport) -> MaskSet {
    let paths: Vec<String> = boundaries
        .iter()
        .flat_map(|b| b.rings())
        .filter(|ring| ring.is_closed())
        .map(|ring| {
            let projected = project_line_to_container(ring.points(), view);
            path_data([projected.as_slice()], true)
        })
        .filter(|d| !d.is_empty())
        .collect();

    MaskSet {
        clip: ClipRegion { paths: paths.clone() },
        dim: DimMask {
            viewport,
            cutouts: paths,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct MaskKey {
    view: ViewTransform,
    viewport: Viewport,
    generation: u64,
}

/// Memo of the last synthesized [`MaskSet`].
///
/// Callers bump `generation` whenever the region set changes.
#[derive(Debug, Default)]
pub struct MaskCache {
    entry: Option<(MaskKey, Arc<MaskSet>)>,
    rebuilds: u64,
}

impl MaskCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_synthesize(
        &mut self,
        boundaries: &[BoundaryFeature],
        generation: u64,
        view: &ViewTransform,
        viewport: Viewport,
    ) -> Arc<MaskSet> {
        let key = MaskKey {
            view: *view,
            viewport,
            generation,
        };

        if let Some((cached_key, masks)) = &self.entry {
            if *cached_key == key {
                return masks.clone();
            }
        }

        let masks = Arc::new(synthesize(boundaries, view, viewport));
        self.rebuilds += 1;
        debug!(
            rings = masks.clip.paths().len(),
            generation,
            zoom = view.zoom(),
            "Masks rebuilt"
        );
        self.entry = Some((key, masks.clone()));
        masks
    }

    /// Number of times the masks were recomputed.
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}
