//! Project persistence
//!
//! A project is a versioned JSON document holding everything needed to
//! rebuild a session offline: stitched region rings, settlements, roads,
//! annotation layers, style and view. Rings are stored, not re-fetched.
//!
//! Documents carry a semantic version. Any `1.x.y` document loads; a
//! different major version is rejected.

use std::path::{Path, PathBuf};

use semver::Version;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::coord::{CoordError, Crs, ViewTransform, DEFAULT_TILE_SIZE};
use crate::export::{write_atomically, ExportError};
use crate::feature::{AnnotationLayer, BoundaryFeature, RoadFeature};
use crate::geometry::GeoPoint;
use crate::session::{SessionInputs, StyleSettings};

/// Version written by this build.
pub const PROJECT_VERSION: &str = "1.0.0";

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write project: {0}")]
    Write(#[from] ExportError),

    #[error("invalid project document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid project version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    #[error("project version {found} is not supported (expected {supported}.x)")]
    UnsupportedVersion { found: Version, supported: u64 },

    #[error("invalid saved view: {0}")]
    View(#[from] CoordError),
}

/// Persisted view transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SavedView {
    pub origin: GeoPoint,
    pub zoom: u8,
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,
    #[serde(default)]
    pub crs: Crs,
}

fn default_tile_size() -> u32 {
    DEFAULT_TILE_SIZE
}

impl From<ViewTransform> for SavedView {
    fn from(view: ViewTransform) -> Self {
        Self {
            origin: view.origin(),
            zoom: view.zoom(),
            tile_size: view.tile_size(),
            crs: view.crs(),
        }
    }
}

impl TryFrom<SavedView> for ViewTransform {
    type Error = CoordError;

    fn try_from(saved: SavedView) -> Result<Self, Self::Error> {
        ViewTransform::new(saved.origin, saved.zoom, saved.tile_size, saved.crs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDocument {
    pub version: String,
    #[serde(default)]
    pub layers: Vec<AnnotationLayer>,
    #[serde(default)]
    pub boundaries: Vec<BoundaryFeature>,
    #[serde(default)]
    pub settlements: Vec<BoundaryFeature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focused_city: Option<BoundaryFeature>,
    #[serde(default)]
    pub roads: Vec<RoadFeature>,
    #[serde(default)]
    pub style: StyleSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<SavedView>,
}

impl Default for ProjectDocument {
    fn default() -> Self {
        Self {
            version: PROJECT_VERSION.to_string(),
            layers: Vec::new(),
            boundaries: Vec::new(),
            settlements: Vec::new(),
            focused_city: None,
            roads: Vec::new(),
            style: StyleSettings::default(),
            view: None,
        }
    }
}

impl ProjectDocument {
    pub fn from_session_inputs(inputs: &SessionInputs) -> Self {
        Self {
            version: PROJECT_VERSION.to_string(),
            layers: inputs.layers.clone(),
            boundaries: inputs.regions.clone(),
            settlements: inputs.settlements.clone(),
            focused_city: inputs.focused_city.clone(),
            roads: inputs.roads.clone(),
            style: inputs.style.clone(),
            view: inputs.view.map(SavedView::from),
        }
    }

    pub fn to_session_inputs(&self) -> Result<SessionInputs, ProjectError> {
        let view = self.view.map(ViewTransform::try_from).transpose()?;
        Ok(SessionInputs {
            regions: self.boundaries.clone(),
            settlements: self.settlements.clone(),
            focused_city: self.focused_city.clone(),
            roads: self.roads.clone(),
            layers: self.layers.clone(),
            style: self.style.clone(),
            view,
        })
    }

    /// Parses a document and checks its version.
    pub fn from_json(json: &str) -> Result<Self, ProjectError> {
        let doc: ProjectDocument = serde_json::from_str(json)?;
        doc.check_version()?;
        Ok(doc)
    }

    pub fn to_json(&self) -> Result<String, ProjectError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn check_version(&self) -> Result<(), ProjectError> {
        let found = Version::parse(self.version.trim()).map_err(|e| ProjectError::InvalidVersion {
            version: self.version.clone(),
            reason: e.to_string(),
        })?;
        let supported = Version::parse(PROJECT_VERSION)
            .map(|v| v.major)
            .unwrap_or(1);

        if found.major != supported {
            return Err(ProjectError::UnsupportedVersion { found, supported });
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ProjectError> {
        let json = std::fs::read_to_string(path).map_err(|source| ProjectError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let doc = Self::from_json(&json)?;
        info!(
            path = %path.display(),
            boundaries = doc.boundaries.len(),
            layers = doc.layers.len(),
            "Project loaded"
        );
        Ok(doc)
    }

    /// Writes the document atomically.
    pub fn save(&self, path: &Path) -> Result<(), ProjectError> {
        write_atomically(path, self.to_json()?.as_bytes())?;
        info!(path = %path.display(), "Project saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{Feature, FeatureCollection, Geometry};
    use crate::geometry::Ring;
    use crate::provider::MapStyle;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn sample() -> ProjectDocument {
        let ring = Ring::from_points(vec![
            GeoPoint::new(37.0, 55.0),
            GeoPoint::new(38.0, 55.0),
            GeoPoint::new(38.0, 56.0),
            GeoPoint::new(37.0, 55.0),
        ]);
        let region = BoundaryFeature::from_rings("osm-1", "Alpha", BTreeMap::new(), None, vec![ring]).unwrap();
        let layer = AnnotationLayer::new(
            "k1",
            "Track",
            FeatureCollection::new(vec![Feature::new(Geometry::Point(GeoPoint::new(37.5, 55.5)))]),
        );
        let view = ViewTransform::new(GeoPoint::new(36.0, 57.0), 7, 256, Crs::WorldMercator).unwrap();

        ProjectDocument {
            boundaries: vec![region],
            layers: vec![layer],
            style: StyleSettings::default().with_map_style(MapStyle::Dark),
            view: Some(view.into()),
            ..ProjectDocument::default()
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("project.json");
        let doc = sample();

        doc.save(&path).unwrap();
        let loaded = ProjectDocument::load(&path).unwrap();
        assert_eq!(loaded, doc);

        let inputs = loaded.to_session_inputs().unwrap();
        assert_eq!(inputs.regions[0].rings().next().unwrap().len(), 4);
        assert_eq!(inputs.view.unwrap().crs(), Crs::WorldMercator);
    }

    #[test]
    fn test_minor_versions_accepted() {
        let doc = ProjectDocument::from_json(r#"{"version": "1.4.2"}"#).unwrap();
        assert!(doc.boundaries.is_empty());
        assert_eq!(doc.style, StyleSettings::default());
    }

    #[test]
    fn test_major_version_rejected() {
        let err = ProjectDocument::from_json(r#"{"version": "2.0.0"}"#).unwrap_err();
        assert!(matches!(err, ProjectError::UnsupportedVersion { supported: 1, .. }));
    }

    #[test]
    fn test_malformed_version_rejected() {
        let err = ProjectDocument::from_json(r#"{"version": "one"}"#).unwrap_err();
        assert!(matches!(err, ProjectError::InvalidVersion { .. }));
    }

    #[test]
    fn test_invalid_saved_view() {
        let mut doc = sample();
        doc.view = Some(SavedView {
            origin: GeoPoint::new(0.0, 89.9),
            zoom: 3,
            tile_size: 256,
            crs: Crs::WebMercator,
        });
        assert!(matches!(doc.to_session_inputs(), Err(ProjectError::View(_))));
    }
}
