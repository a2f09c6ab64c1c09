//! SVG document assembly.

use std::fmt::Write;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::coord::Viewport;
use crate::mask::{MaskSet, CLIP_PATH_ID, DIM_MASK_ID, DIM_OPACITY};
use crate::render::{escape_xml, PathPrimitive, HATCH_PATTERN_ID};

/// Group ids, bottom to top.
pub const REGIONS_GROUP: &str = "Regions";
pub const ROADS_GROUP: &str = "Roads";
pub const SETTLEMENTS_GROUP: &str = "Settlements";
/// Prefix of per-layer annotation group ids.
pub const LAYER_GROUP_PREFIX: &str = "KML_";

const HATCH_COLOR: &str = "#ff9800";
const HATCH_SPACING: u32 = 6;

/// Base64 `data:` URL for an encoded JPEG.
pub fn jpeg_data_url(jpeg: &[u8]) -> String {
    format!("data:image/jpeg;base64,{}", STANDARD.encode(jpeg))
}

/// One annotation layer's rendered output.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerGroup {
    pub id: String,
    pub primitives: Vec<PathPrimitive>,
}

/// Everything that goes into one exported document.
#[derive(Debug, Clone)]
pub struct ExportScene {
    pub viewport: Viewport,
    pub background: String,
    /// Encoded basemap; `None` omits the raster layer.
    pub raster_jpeg: Option<Vec<u8>>,
    pub masks: MaskSet,
    pub dim_background: bool,
    pub regions: Vec<PathPrimitive>,
    pub roads: Vec<PathPrimitive>,
    pub settlements: Vec<PathPrimitive>,
    pub layers: Vec<LayerGroup>,
}

impl ExportScene {
    pub fn new(viewport: Viewport, background: impl Into<String>, masks: MaskSet) -> Self {
        Self {
            viewport,
            background: background.into(),
            raster_jpeg: None,
            masks,
            dim_background: false,
            regions: Vec::new(),
            roads: Vec::new(),
            settlements: Vec::new(),
            layers: Vec::new(),
        }
    }
}

/// Serializer for [`ExportScene`].
///
/// Output order is fixed: background, raster, definitions, dim overlay,
/// then the region, road, settlement and annotation groups. Roads and
/// settlements are clipped to the regions whenever any region is active.
pub struct SvgDocument;

impl SvgDocument {
    pub fn build(scene: &ExportScene) -> String {
        let (w, h) = (scene.viewport.width, scene.viewport.height);
        let clipped = !scene.masks.clip.is_identity();
        let dimmed = scene.dim_background && !scene.masks.dim.is_inert();

        let mut svg = String::new();
        // Write on String is infallible.
        let _ = write!(
            svg,
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>\n\
             <svg width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\" \
             xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\">\n"
        );
        let _ = writeln!(
            svg,
            "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
            escape_xml(&scene.background)
        );

        if let Some(jpeg) = &scene.raster_jpeg {
            let _ = writeln!(
                svg,
                "<image xlink:href=\"{}\" x=\"0\" y=\"0\" width=\"{w}\" height=\"{h}\" preserveAspectRatio=\"none\"/>",
                jpeg_data_url(jpeg)
            );
        }

        svg.push_str("<defs>\n");
        if clipped {
            let _ = write!(svg, "<clipPath id=\"{}\">", CLIP_PATH_ID);
            for d in scene.masks.clip.paths() {
                let _ = write!(svg, "<path d=\"{}\"/>", d);
            }
            svg.push_str("</clipPath>\n");
        }
        if dimmed {
            let _ = write!(
                svg,
                "<mask id=\"{}\" maskUnits=\"userSpaceOnUse\" x=\"0\" y=\"0\" width=\"{w}\" height=\"{h}\">\
                 <rect x=\"0\" y=\"0\" width=\"{w}\" height=\"{h}\" fill=\"white\"/>",
                DIM_MASK_ID
            );
            for d in scene.masks.dim.cutouts() {
                let _ = write!(svg, "<path d=\"{}\" fill=\"black\"/>", d);
            }
            svg.push_str("</mask>\n");
        }
        let _ = writeln!(
            svg,
            "<pattern id=\"{id}\" patternUnits=\"userSpaceOnUse\" width=\"{s}\" height=\"{s}\" \
             patternTransform=\"rotate(45)\"><line x1=\"0\" y1=\"0\" x2=\"0\" y2=\"{s}\" \
             stroke=\"{c}\" stroke-width=\"1.5\" stroke-opacity=\"0.6\"/></pattern>",
            id = HATCH_PATTERN_ID,
            s = HATCH_SPACING,
            c = HATCH_COLOR
        );
        svg.push_str("</defs>\n");

        if dimmed {
            let _ = writeln!(
                svg,
                "<rect x=\"0\" y=\"0\" width=\"{w}\" height=\"{h}\" fill=\"#000000\" fill-opacity=\"{}\" mask=\"url(#{})\"/>",
                DIM_OPACITY, DIM_MASK_ID
            );
        }

        write_group(&mut svg, REGIONS_GROUP, false, &scene.regions);
        write_group(&mut svg, ROADS_GROUP, clipped, &scene.roads);
        write_group(&mut svg, SETTLEMENTS_GROUP, clipped, &scene.settlements);
        for layer in &scene.layers {
            let id = format!("{}{}", LAYER_GROUP_PREFIX, layer.id);
            write_group(&mut svg, &id, false, &layer.primitives);
        }

        svg.push_str("</svg>\n");
        svg
    }
}

fn write_group(svg: &mut String, id: &str, clipped: bool, primitives: &[PathPrimitive]) {
    let _ = write!(svg, "<g id=\"{}\"", escape_xml(id));
    if clipped {
        let _ = write!(svg, " clip-path=\"url(#{})\"", CLIP_PATH_ID);
    }
    svg.push_str(">\n");
    for primitive in primitives {
        svg.push_str(&primitive.to_svg());
        svg.push('\n');
    }
    svg.push_str("</g>\n");
}
