//! OpenStreetMap element references.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Offset added to a relation id to obtain its Overpass area id.
pub const RELATION_AREA_OFFSET: u64 = 3_600_000_000;
/// Offset added to a closed way id to obtain its Overpass area id.
pub const WAY_AREA_OFFSET: u64 = 2_400_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsmType {
    Node,
    Way,
    Relation,
}

impl OsmType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OsmType::Node => "node",
            OsmType::Way => "way",
            OsmType::Relation => "relation",
        }
    }
}

impl fmt::Display for OsmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OsmType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "node" | "n" => Ok(OsmType::Node),
            "way" | "w" => Ok(OsmType::Way),
            "relation" | "rel" | "r" => Ok(OsmType::Relation),
            other => Err(format!("unknown OSM element type '{}'", other)),
        }
    }
}

/// Typed element id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OsmRef {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: OsmType,
}

impl OsmRef {
    pub const fn new(id: u64, kind: OsmType) -> Self {
        Self { id, kind }
    }

    /// Overpass area id, when this element can bound an area.
    pub fn area_id(&self) -> Option<u64> {
        match self.kind {
            OsmType::Relation => Some(RELATION_AREA_OFFSET + self.id),
            OsmType::Way => Some(WAY_AREA_OFFSET + self.id),
            OsmType::Node => None,
        }
    }
}
