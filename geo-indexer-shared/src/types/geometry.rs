//! Geometry value types.
//!
//! Geometry is stored and forwarded to the index store as GeoJSON; intersection
//! tests are always executed by the store, never locally.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A `[longitude, latitude]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct CenterPoint {
    pub lon: f64,
    pub lat: f64,
}

impl CenterPoint {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// GeoJSON point geometry for this coordinate.
    pub fn to_geometry(&self) -> Geometry {
        Geometry(json!({
            "type": "point",
            "coordinates": [self.lon, self.lat]
        }))
    }
}

impl From<[f64; 2]> for CenterPoint {
    fn from(pair: [f64; 2]) -> Self {
        Self::new(pair[0], pair[1])
    }
}

impl From<CenterPoint> for [f64; 2] {
    fn from(point: CenterPoint) -> Self {
        [point.lon, point.lat]
    }
}

/// An opaque GeoJSON geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Geometry(pub Value);

impl Geometry {
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// A geometry with no content (`{}` or `[]`) counts as empty.
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }
}
