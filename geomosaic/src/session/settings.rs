//! User-facing rendering and export settings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::mosaic::{DEFAULT_JPEG_QUALITY, DEFAULT_SUPERSAMPLE, DEFAULT_ZOOM_OFFSET, MAX_SUPERSAMPLE};
use crate::provider::MapStyle;
use crate::render::LayerStyle;
use crate::roads::RoadFetchOptions;

/// Display choices persisted with a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleSettings {
    pub map_style: MapStyle,
    /// Darken everything outside the selected regions.
    pub dim_background: bool,
    /// Use per-feature colours in annotation layers.
    pub multi_color: bool,
    pub show_settlements: bool,
    pub roads: RoadFetchOptions,
}

impl Default for StyleSettings {
    fn default() -> Self {
        Self {
            map_style: MapStyle::default(),
            dim_background: false,
            multi_color: true,
            show_settlements: false,
            roads: RoadFetchOptions::new(true, false),
        }
    }
}

impl StyleSettings {
    pub fn with_map_style(mut self, style: MapStyle) -> Self {
        self.map_style = style;
        self
    }

    pub fn with_dim_background(mut self, dim: bool) -> Self {
        self.dim_background = dim;
        self
    }

    pub fn with_multi_color(mut self, multi_color: bool) -> Self {
        self.multi_color = multi_color;
        self
    }

    pub fn layer_style(&self) -> LayerStyle {
        LayerStyle::default().with_multi_color(self.multi_color)
    }
}

/// Output parameters for exports.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSettings {
    pub supersample: u32,
    pub zoom_offset: u8,
    pub jpeg_quality: u8,
    /// Directory for generated file names.
    pub directory: PathBuf,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            supersample: DEFAULT_SUPERSAMPLE,
            zoom_offset: DEFAULT_ZOOM_OFFSET,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            directory: default_export_dir(),
        }
    }
}

impl ExportSettings {
    pub fn with_supersample(mut self, supersample: u32) -> Self {
        self.supersample = supersample.clamp(1, MAX_SUPERSAMPLE);
        self
    }

    pub fn with_zoom_offset(mut self, zoom_offset: u8) -> Self {
        self.zoom_offset = zoom_offset;
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }
}

/// Downloads folder when known, otherwise the working directory.
pub fn default_export_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}
