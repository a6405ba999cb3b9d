//! Data models for STAC imagery catalog responses.
//!
//! Features are kept as raw JSON: the widget only reads the geometry to place
//! a marker and displays everything else verbatim.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ScenetrackError;

/// A WGS84 position in degrees.
///
/// Serialized with the `lat`/`lng` keys the map surface uses for pointer events.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lng")]
    pub longitude: f64,
}

impl Coordinate {
    /// Create a coordinate, rejecting values outside [-90, 90] / [-180, 180].
    ///
    /// # Errors
    ///
    /// Returns `InvalidCoordinate` if either axis is out of range or not finite.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ScenetrackError> {
        let coordinate = Self {
            latitude,
            longitude,
        };
        coordinate.validate()?;
        Ok(coordinate)
    }

    /// Check that both axes are within WGS84 range.
    pub fn validate(&self) -> Result<(), ScenetrackError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ScenetrackError::InvalidCoordinate(format!(
                "latitude {} out of range [-90, 90]",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ScenetrackError::InvalidCoordinate(format!(
                "longitude {} out of range [-180, 180]",
                self.longitude
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}°, {:.4}°", self.latitude, self.longitude)
    }
}

impl std::str::FromStr for Coordinate {
    type Err = ScenetrackError;

    /// Parse `lat,lng`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 2 {
            return Err(ScenetrackError::InvalidCoordinate(format!(
                "expected 2 values (lat,lng), got {}",
                parts.len()
            )));
        }

        let vals: Result<Vec<f64>, _> = parts.iter().map(|p| p.trim().parse::<f64>()).collect();
        let vals = vals.map_err(|e| {
            ScenetrackError::InvalidCoordinate(format!("invalid number in coordinate: {e}"))
        })?;

        Self::new(vals[0], vals[1])
    }
}

/// One catalog record describing a satellite scene.
///
/// Held verbatim; nothing beyond the geometry is validated or normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageryFeature(Value);

impl ImageryFeature {
    #[cfg(test)]
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// The raw JSON record.
    #[must_use]
    pub fn as_json(&self) -> &Value {
        &self.0
    }

    /// Scene identifier, if the record carries one.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    /// Acquisition timestamp from `properties.datetime`, if present.
    #[must_use]
    pub fn datetime(&self) -> Option<&str> {
        self.0
            .pointer("/properties/datetime")
            .and_then(Value::as_str)
    }

    /// First `[longitude, latitude]` pair of the geometry, as a `Coordinate`.
    ///
    /// Descends through nested coordinate arrays so points, polygons and
    /// multipolygons all yield their first vertex.
    #[must_use]
    pub fn first_position(&self) -> Option<Coordinate> {
        let mut node = self.0.pointer("/geometry/coordinates")?;
        loop {
            let items = node.as_array()?;
            match (items.first()?, items.get(1)) {
                (Value::Number(lng), Some(Value::Number(lat))) => {
                    return Some(Coordinate {
                        latitude: lat.as_f64()?,
                        longitude: lng.as_f64()?,
                    });
                }
                (first @ Value::Array(_), _) => node = first,
                _ => return None,
            }
        }
    }
}

/// A found scene: marker position and the record it came from.
///
/// Both are present or both absent, which `Option<Imagery>` enforces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Imagery {
    pub coordinate: Coordinate,
    pub feature: ImageryFeature,
}

impl TryFrom<ImageryFeature> for Imagery {
    type Error = ScenetrackError;

    fn try_from(feature: ImageryFeature) -> Result<Self, Self::Error> {
        let coordinate = feature.first_position().ok_or_else(|| {
            ScenetrackError::InvalidResponse(
                "feature geometry has no [longitude, latitude] pair".into(),
            )
        })?;
        Ok(Self {
            coordinate,
            feature,
        })
    }
}

/// Top-level STAC item search response.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemCollection {
    /// "FeatureCollection" when the server sets it
    #[serde(rename = "type", default)]
    pub type_: Option<String>,

    /// Matching scenes, at most `limit` of them
    pub features: Vec<ImageryFeature>,
}

impl ItemCollection {
    /// Validate the response structure.
    pub fn validate(&self) -> Result<(), ScenetrackError> {
        match self.type_.as_deref() {
            None | Some("FeatureCollection") => Ok(()),
            Some(other) => Err(ScenetrackError::InvalidResponse(format!(
                "expected type 'FeatureCollection', got '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coordinate_parse() {
        let c: Coordinate = "37.77,-122.42".parse().unwrap();
        assert!((c.latitude - 37.77).abs() < 1e-9);
        assert!((c.longitude - (-122.42)).abs() < 1e-9);
    }

    #[test]
    fn test_coordinate_out_of_range() {
        assert!("91.0,0.0".parse::<Coordinate>().is_err());
        assert!("0.0,-180.5".parse::<Coordinate>().is_err());
        assert!("1.0".parse::<Coordinate>().is_err());
        assert!("abc,1.0".parse::<Coordinate>().is_err());
    }

    #[test]
    fn test_coordinate_serializes_as_lat_lng() {
        let c = Coordinate::new(1.5, 2.5).unwrap();
        let v = serde_json::to_value(c).unwrap();
        assert_eq!(v, json!({"lat": 1.5, "lng": 2.5}));
    }

    #[test]
    fn test_point_geometry_position_is_reversed() {
        let feature = ImageryFeature::new(json!({
            "geometry": {"type": "Point", "coordinates": [-122.0, 37.0]},
            "properties": {}
        }));
        let pos = feature.first_position().unwrap();
        assert!((pos.latitude - 37.0).abs() < 1e-9);
        assert!((pos.longitude - (-122.0)).abs() < 1e-9);
    }

    #[test]
    fn test_polygon_geometry_uses_first_vertex() {
        let feature = ImageryFeature::new(json!({
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[-121.5, 38.1], [-120.0, 38.1], [-120.0, 36.0], [-121.5, 38.1]]]
            }
        }));
        let pos = feature.first_position().unwrap();
        assert!((pos.latitude - 38.1).abs() < 1e-9);
        assert!((pos.longitude - (-121.5)).abs() < 1e-9);
    }

    #[test]
    fn test_missing_geometry_is_rejected() {
        let feature = ImageryFeature::new(json!({"properties": {"cloud_cover": 3}}));
        assert!(feature.first_position().is_none());
        assert!(Imagery::try_from(feature).is_err());
    }

    #[test]
    fn test_parse_item_collection() {
        let body = r#"{
            "type": "FeatureCollection",
            "features": [{
                "id": "LC09_L2SR_044034_20240301_02_T1_SR",
                "geometry": {"type": "Point", "coordinates": [-122.1, 37.5]},
                "properties": {"datetime": "2024-03-01T18:42:10Z", "eo:cloud_cover": 12.5}
            }]
        }"#;
        let collection: ItemCollection = serde_json::from_str(body).unwrap();
        collection.validate().unwrap();
        assert_eq!(collection.features.len(), 1);

        let feature = &collection.features[0];
        assert_eq!(feature.id(), Some("LC09_L2SR_044034_20240301_02_T1_SR"));
        assert_eq!(feature.datetime(), Some("2024-03-01T18:42:10Z"));
    }

    #[test]
    fn test_missing_features_is_parse_error() {
        assert!(serde_json::from_str::<ItemCollection>(r#"{"type": "FeatureCollection"}"#).is_err());
    }

    #[test]
    fn test_wrong_type_fails_validation() {
        let collection: ItemCollection =
            serde_json::from_str(r#"{"type": "Feature", "features": []}"#).unwrap();
        assert!(collection.validate().is_err());
    }
}
