//! GeoJSON point sources for symbol layers.
//!
//! Only `Point` geometries are placed; other geometry types deserialize as
//! [`Geometry::Unsupported`] and are skipped by the layer.

use foundation::math::Coordinate;
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub id: Option<Value>,
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point {
        coordinates: Vec<f64>,
    },
    #[serde(other)]
    Unsupported,
}

impl FeatureCollection {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn points(coordinates: impl IntoIterator<Item = (String, Coordinate)>) -> Self {
        let features = coordinates
            .into_iter()
            .map(|(key, c)| Feature {
                id: Some(Value::String(key)),
                geometry: Some(Geometry::Point {
                    coordinates: vec![c.lon, c.lat, c.alt_m],
                }),
                properties: Map::new(),
            })
            .collect();
        Self { features }
    }
}

impl Feature {
    /// Point position, if the feature is a well-formed point.
    pub fn coordinate(&self) -> Option<Coordinate> {
        match &self.geometry {
            Some(Geometry::Point { coordinates }) => Coordinate::from_slice(coordinates),
            _ => None,
        }
    }

    /// Identity used to match features across source updates: the key
    /// property, then the feature id, then the feature's position in the source.
    pub fn key(&self, key_property: Option<&str>, position: usize) -> String {
        key_property
            .and_then(|p| self.properties.get(p))
            .or(self.id.as_ref())
            .and_then(value_key)
            .unwrap_or_else(|| format!("#{position}"))
    }
}

fn value_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
