//! Export artifact
//!
//! A self-contained SVG: background rectangle, the basemap mosaic embedded
//! as a base64 JPEG, clip/mask/pattern definitions, then one group per
//! layer. Files are written atomically so a cancelled or failed export never
//! leaves a partial document behind.

mod file;
mod svg;

pub use file::{default_export_path, write_atomically};
pub use svg::{
    jpeg_data_url, ExportScene, LayerGroup, SvgDocument, LAYER_GROUP_PREFIX, REGIONS_GROUP, ROADS_GROUP,
    SETTLEMENTS_GROUP,
};

use std::path::PathBuf;

use thiserror::Error;

use crate::mosaic::MosaicError;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("basemap failed: {0}")]
    Mosaic(#[from] MosaicError),

    #[error("export cancelled")]
    Cancelled,
}
