//! Read-only thematic datasets supplied by the host application as GeoJSON-like feature
//! collections.

use std::path::Path;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::map::coordinates::WGS84Coordinate;

#[derive(Error, Debug)]
pub enum DatasetError {
  #[error("dataset must be a GeoJSON object")]
  NotAnObject,
  #[error("unsupported GeoJSON type: {0}")]
  UnsupportedType(String),
  #[error("invalid JSON: {0}")]
  Json(#[from] serde_json::Error),
  #[error("could not read dataset: {0}")]
  Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureGeometry {
  Point(WGS84Coordinate),
  LineString(Vec<WGS84Coordinate>),
  MultiLineString(Vec<Vec<WGS84Coordinate>>),
  /// Outer ring first, holes after.
  Polygon(Vec<Vec<WGS84Coordinate>>),
  MultiPolygon(Vec<Vec<Vec<WGS84Coordinate>>>),
}

impl FeatureGeometry {
  /// The exterior rings of all polygons.
  #[must_use]
  pub fn polygons(&self) -> Vec<&[WGS84Coordinate]> {
    match self {
      FeatureGeometry::Polygon(rings) => rings.first().map(Vec::as_slice).into_iter().collect(),
      FeatureGeometry::MultiPolygon(polys) => polys
        .iter()
        .filter_map(|rings| rings.first().map(Vec::as_slice))
        .collect(),
      _ => Vec::new(),
    }
  }

  /// All line paths.
  #[must_use]
  pub fn lines(&self) -> Vec<&[WGS84Coordinate]> {
    match self {
      FeatureGeometry::LineString(path) => vec![path.as_slice()],
      FeatureGeometry::MultiLineString(paths) => paths.iter().map(Vec::as_slice).collect(),
      _ => Vec::new(),
    }
  }

  #[must_use]
  pub fn point(&self) -> Option<WGS84Coordinate> {
    match self {
      FeatureGeometry::Point(c) => Some(*c),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
  pub geometry: FeatureGeometry,
  pub properties: Map<String, Value>,
}

impl Feature {
  #[must_use]
  pub fn property_str(&self, name: &str) -> Option<&str> {
    self.properties.get(name).and_then(Value::as_str)
  }

  /// Numeric property, accepting numeric strings.
  #[must_use]
  pub fn property_f64(&self, name: &str) -> Option<f64> {
    match self.properties.get(name)? {
      Value::Number(n) => n.as_f64(),
      Value::String(s) => s.trim().parse().ok(),
      _ => None,
    }
  }

  /// A property rendered for popups.
  #[must_use]
  pub fn property_display(&self, name: &str) -> Option<String> {
    match self.properties.get(name)? {
      Value::Null => None,
      Value::String(s) => Some(s.clone()),
      other => Some(other.to_string()),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
  pub features: Vec<Feature>,
}

impl FeatureCollection {
  pub fn from_json(value: &Value) -> Result<Self, DatasetError> {
    let obj = value.as_object().ok_or(DatasetError::NotAnObject)?;
    let mut collection = Self::default();
    match obj.get("type").and_then(Value::as_str) {
      Some("FeatureCollection") => {
        for feature in obj
          .get("features")
          .and_then(Value::as_array)
          .into_iter()
          .flatten()
        {
          match parse_feature(feature) {
            Some(f) => collection.features.push(f),
            None => log::warn!("Skipping feature without usable geometry"),
          }
        }
      }
      Some("Feature") => collection.features.extend(parse_feature(value)),
      Some(other) => return Err(DatasetError::UnsupportedType(other.to_string())),
      None => return Err(DatasetError::UnsupportedType("<missing>".to_string())),
    }
    Ok(collection)
  }

  pub fn parse(data: &str) -> Result<Self, DatasetError> {
    Self::from_json(&serde_json::from_str(data)?)
  }

  pub fn from_file(path: &Path) -> Result<Self, DatasetError> {
    Self::parse(&std::fs::read_to_string(path)?)
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.features.len()
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.features.is_empty()
  }
}

fn parse_feature(feature: &Value) -> Option<Feature> {
  let obj = feature.as_object()?;
  let geometry = parse_geometry(obj.get("geometry")?)?;
  let properties = obj
    .get("properties")
    .and_then(Value::as_object)
    .cloned()
    .unwrap_or_default();
  Some(Feature {
    geometry,
    properties,
  })
}

fn parse_position(value: &Value) -> Option<WGS84Coordinate> {
  let arr = value.as_array()?;
  let lon = arr.first()?.as_f64()?;
  let lat = arr.get(1)?.as_f64()?;
  let coord = WGS84Coordinate::new(lat, lon);
  coord.is_valid().then_some(coord)
}

fn parse_path(value: &Value) -> Option<Vec<WGS84Coordinate>> {
  value.as_array()?.iter().map(parse_position).collect()
}

fn parse_rings(value: &Value) -> Option<Vec<Vec<WGS84Coordinate>>> {
  value.as_array()?.iter().map(parse_path).collect()
}

fn parse_geometry(value: &Value) -> Option<FeatureGeometry> {
  let obj = value.as_object()?;
  let coords = obj.get("coordinates")?;
  match obj.get("type").and_then(Value::as_str)? {
    "Point" => parse_position(coords).map(FeatureGeometry::Point),
    "LineString" => parse_path(coords).map(FeatureGeometry::LineString),
    "MultiLineString" => parse_rings(coords).map(FeatureGeometry::MultiLineString),
    "Polygon" => parse_rings(coords).map(FeatureGeometry::Polygon),
    "MultiPolygon" => coords
      .as_array()?
      .iter()
      .map(parse_rings)
      .collect::<Option<Vec<_>>>()
      .map(FeatureGeometry::MultiPolygon),
    other => {
      log::debug!("Unsupported geometry type {other}");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn parses_mixed_collection() {
    let value = json!({
      "type": "FeatureCollection",
      "features": [
        {
          "type": "Feature",
          "properties": {"name": "Ward A", "population": 12000},
          "geometry": {"type": "Polygon", "coordinates": [[[72.8, 19.0], [72.9, 19.0], [72.9, 19.1], [72.8, 19.0]]]}
        },
        {
          "type": "Feature",
          "properties": {"type": "road", "name": "LBS Marg"},
          "geometry": {"type": "LineString", "coordinates": [[72.8, 19.0], [72.85, 19.05]]}
        },
        {
          "type": "Feature",
          "properties": {},
          "geometry": {"type": "Point", "coordinates": ["bad", 19.0]}
        }
      ]
    });
    let fc = FeatureCollection::from_json(&value).unwrap();
    assert_eq!(fc.len(), 2);
    assert_eq!(fc.features[0].geometry.polygons().len(), 1);
    assert_eq!(fc.features[0].property_f64("population"), Some(12000.));
    assert_eq!(fc.features[1].property_str("type"), Some("road"));
    assert_eq!(fc.features[1].geometry.lines()[0].len(), 2);
  }

  #[test]
  fn rejects_non_collections() {
    assert!(FeatureCollection::from_json(&json!([1, 2])).is_err());
    assert!(FeatureCollection::from_json(&json!({"type": "Topology"})).is_err());
  }
}
