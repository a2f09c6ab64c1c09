//! Layer styles.

use serde::{Deserialize, Serialize};

use super::primitive::{Fill, Stroke};
use crate::feature::RoadClass;

/// Colour used when neither a feature nor its layer names one.
pub const FALLBACK_COLOR: &str = "#A855F7";
/// Id of the hatch `<pattern>` settlements are filled with.
pub const HATCH_PATTERN_ID: &str = "settlement-hatch";

/// Highlighted outline for selected regions: a solid halo under a dashed line.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryStyle {
    pub halo: Stroke,
    pub line: Stroke,
    pub fill: Fill,
}

impl Default for BoundaryStyle {
    fn default() -> Self {
        Self {
            halo: Stroke::solid("#3b82f6", 4.0).with_opacity(0.35),
            line: Stroke::solid("#3b82f6", 2.5).with_dash(8.0, 12.0),
            fill: Fill::color("#3b82f6", 0.03),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoadStyle {
    pub federal: Stroke,
    pub regional: Stroke,
}

impl RoadStyle {
    pub fn stroke(&self, class: RoadClass) -> &Stroke {
        match class {
            RoadClass::Federal => &self.federal,
            RoadClass::Regional => &self.regional,
        }
    }
}

impl Default for RoadStyle {
    fn default() -> Self {
        Self {
            federal: Stroke::solid("#555555", 3.5),
            regional: Stroke::solid("#888888", 1.8).with_opacity(0.7),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettlementStyle {
    pub stroke: Stroke,
    pub fill: Fill,
    pub focused_stroke: Stroke,
    pub focused_fill: Fill,
}

impl Default for SettlementStyle {
    fn default() -> Self {
        Self {
            stroke: Stroke::solid("#ff9800", 2.0).with_dash(4.0, 6.0),
            fill: Fill::pattern(HATCH_PATTERN_ID, 1.0),
            focused_stroke: Stroke::solid("#ff3d00", 4.0),
            focused_fill: Fill::color("#ff3d00", 0.15),
        }
    }
}

/// Styling for imported annotation layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerStyle {
    /// Honour per-feature `color` properties.
    pub multi_color: bool,
    pub line_width: f64,
    pub polygon_fill_opacity: f64,
    pub point_color: String,
    pub point_radius: f64,
    pub point_outline: f64,
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self {
            multi_color: false,
            line_width: 1.0,
            polygon_fill_opacity: 0.1,
            point_color: "#ff0000".to_string(),
            point_radius: 4.5,
            point_outline: 1.2,
        }
    }
}

impl LayerStyle {
    pub fn with_multi_color(mut self, multi_color: bool) -> Self {
        self.multi_color = multi_color;
        self
    }
}

/// Picks a feature's colour: its own colour in multi-colour mode, then the
/// layer colour, then [`FALLBACK_COLOR`]. Blank candidates are skipped.
pub fn resolve_color<'a>(feature_color: Option<&'a str>, layer_color: Option<&'a str>, multi_color: bool) -> &'a str {
    fn usable(color: &str) -> Option<&str> {
        Some(color.trim()).filter(|c| !c.is_empty())
    }

    feature_color
        .filter(|_| multi_color)
        .and_then(usable)
        .or_else(|| layer_color.and_then(usable))
        .unwrap_or(FALLBACK_COLOR)
}
