//! User annotation layers in GeoJSON form.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::geometry::GeoPoint;

/// GeoJSON geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(GeoPoint),
    MultiPoint(Vec<GeoPoint>),
    LineString(Vec<GeoPoint>),
    MultiLineString(Vec<Vec<GeoPoint>>),
    Polygon(Vec<Vec<GeoPoint>>),
    MultiPolygon(Vec<Vec<Vec<GeoPoint>>>),
}

/// GeoJSON feature. Only `name` and `color` properties are interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature {
    #[serde(default)]
    pub properties: Map<String, Value>,
    pub geometry: Option<Geometry>,
}

impl Feature {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            properties: Map::new(),
            geometry: Some(geometry),
        }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.properties.get("name").and_then(Value::as_str)
    }

    /// The raw `color` property. Blank values are resolved at render time.
    pub fn color(&self) -> Option<&str> {
        self.properties.get("color").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

fn default_visible() -> bool {
    true
}

/// A named overlay of imported features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationLayer {
    pub id: String,
    pub name: String,
    /// Layer default colour; empty means "use the global fallback".
    #[serde(default)]
    pub color: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
    pub features: FeatureCollection,
}

impl AnnotationLayer {
    pub fn new(id: impl Into<String>, name: impl Into<String>, features: FeatureCollection) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: String::new(),
            visible: true,
            features,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// The layer colour, `None` while unset.
    pub fn color(&self) -> Option<&str> {
        Some(self.color.as_str()).filter(|c| !c.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_geojson_collection() {
        let json = r##"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {"name": "Camp", "color": "#00ff00"},
                    "geometry": {"type": "Point", "coordinates": [37.5, 55.7]}
                },
                {
                    "type": "Feature",
                    "properties": {"name": "Track"},
                    "geometry": {"type": "LineString", "coordinates": [[37.0, 55.0], [37.1, 55.1]]}
                }
            ]
        }"##;

        let collection: FeatureCollection = serde_json::from_str(json).unwrap();
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.features[0].color(), Some("#00ff00"));
        assert_eq!(collection.features[1].color(), None);
        assert_eq!(collection.features[1].name(), Some("Track"));
        assert!(matches!(
            collection.features[0].geometry,
            Some(Geometry::Point(p)) if p == GeoPoint::new(37.5, 55.7)
        ));
    }

    #[test]
    fn test_serialize_feature_has_type() {
        let feature = Feature::new(Geometry::Point(GeoPoint::new(1.0, 2.0))).with_property("name", "x");
        let value = serde_json::to_value(&feature).unwrap();
        assert_eq!(value["type"], "Feature");
        assert_eq!(value["geometry"]["type"], "Point");
        assert_eq!(value["geometry"]["coordinates"][0], 1.0);
    }

    #[test]
    fn test_color_accessors() {
        let feature = Feature::new(Geometry::Point(GeoPoint::new(0.0, 0.0))).with_property("color", "#abcdef");
        assert_eq!(feature.color(), Some("#abcdef"));
        let numeric = Feature::new(Geometry::Point(GeoPoint::new(0.0, 0.0))).with_property("color", 7);
        assert_eq!(numeric.color(), None);

        let layer = AnnotationLayer::new("l1", "Layer", FeatureCollection::default());
        assert_eq!(layer.color(), None);
        assert_eq!(layer.with_color("#123456").color(), Some("#123456"));
    }
}
