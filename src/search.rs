pub mod providers;
pub mod ui;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::map::coordinates::WGS84Coordinate;

#[derive(Error, Debug)]
pub enum GeocodeError {
  #[error("geocoder answered with status {0}")]
  Status(u16),
  #[error("geocoder request failed: {0}")]
  Transport(String),
  #[error("unexpected geocoder response: {0}")]
  Decode(String),
}

/// One ranked hit of a place lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
  pub place_id: String,
  pub display_name: String,
  pub lat: f64,
  pub lon: f64,
  #[serde(rename = "type")]
  pub place_type: String,
}

/// Camera zoom for a kind of place; larger areas get wider views.
#[must_use]
pub fn zoom_for_place_type(place_type: &str) -> f64 {
  match place_type.to_lowercase().as_str() {
    "country" => 5.,
    "state" => 7.,
    "city" | "administrative" => 12.,
    "coordinate" => 15.,
    _ => 13.,
  }
}

impl GeocodeResult {
  #[must_use]
  pub fn coordinate(&self) -> WGS84Coordinate {
    WGS84Coordinate::new(self.lat, self.lon)
  }

  #[must_use]
  pub fn zoom_level(&self) -> f64 {
    zoom_for_place_type(&self.place_type)
  }
}

/// A text-to-place lookup service.
#[async_trait::async_trait]
pub trait Geocoder: Send + Sync {
  /// Human-readable name of the service.
  fn name(&self) -> &str;

  async fn lookup(&self, query: &str) -> Result<Vec<GeocodeResult>, GeocodeError>;
}

/// Which service resolves place names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GeocoderConfig {
  /// The application backend's `/api/geocode` endpoint.
  #[default]
  Backend,
  /// OpenStreetMap Nominatim.
  Nominatim { base_url: Option<String> },
}

/// Resolves queries, trying coordinates locally before asking the geocoder. Failures degrade
/// to an empty result list.
#[derive(Clone)]
pub struct GeocoderClient {
  geocoder: Arc<dyn Geocoder>,
  coordinate_parser: Arc<providers::CoordinateParser>,
}

impl GeocoderClient {
  #[must_use]
  pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
    Self {
      geocoder,
      coordinate_parser: Arc::new(providers::CoordinateParser::new()),
    }
  }

  #[must_use]
  pub fn from_config(config: &GeocoderConfig, api_base_url: &str) -> Self {
    let geocoder: Arc<dyn Geocoder> = match config {
      GeocoderConfig::Backend => Arc::new(providers::BackendGeocoder::new(api_base_url)),
      GeocoderConfig::Nominatim { base_url } => {
        Arc::new(providers::NominatimGeocoder::new(base_url.clone()))
      }
    };
    Self::new(geocoder)
  }

  #[must_use]
  pub fn geocoder_name(&self) -> &str {
    self.geocoder.name()
  }

  pub async fn lookup(&self, query: &str) -> Vec<GeocodeResult> {
    let query = query.trim();
    if query.is_empty() {
      return Vec::new();
    }
    if let Some(result) = self.coordinate_parser.parse_coordinate(query) {
      log::info!(
        "Parsed coordinate input: '{query}' -> {:.4}, {:.4}",
        result.lat,
        result.lon
      );
      return vec![result];
    }
    match self.geocoder.lookup(query).await {
      Ok(results) => {
        log::debug!(
          "{} returned {} results for '{query}'",
          self.geocoder.name(),
          results.len()
        );
        results
      }
      Err(e) => {
        log::warn!("Geocoding '{query}' with {} failed: {e}", self.geocoder.name());
        Vec::new()
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rstest::rstest;
  use std::sync::atomic::{AtomicUsize, Ordering};

  struct Failing;

  #[async_trait::async_trait]
  impl Geocoder for Failing {
    fn name(&self) -> &'static str {
      "failing"
    }

    async fn lookup(&self, _query: &str) -> Result<Vec<GeocodeResult>, GeocodeError> {
      Err(GeocodeError::Transport("connection refused".to_string()))
    }
  }

  #[derive(Default)]
  struct Counting(AtomicUsize);

  #[async_trait::async_trait]
  impl Geocoder for Counting {
    fn name(&self) -> &'static str {
      "counting"
    }

    async fn lookup(&self, query: &str) -> Result<Vec<GeocodeResult>, GeocodeError> {
      self.0.fetch_add(1, Ordering::SeqCst);
      Ok(vec![GeocodeResult {
        place_id: "1".to_string(),
        display_name: query.to_string(),
        lat: 19.07,
        lon: 72.87,
        place_type: "city".to_string(),
      }])
    }
  }

  #[rstest]
  #[case("country", 5.)]
  #[case("State", 7.)]
  #[case("city", 12.)]
  #[case("administrative", 12.)]
  #[case("suburb", 13.)]
  #[case("", 13.)]
  fn zoom_heuristic(#[case] place_type: &str, #[case] zoom: f64) {
    assert!((zoom_for_place_type(place_type) - zoom).abs() < f64::EPSILON);
  }

  #[tokio::test]
  async fn failures_become_empty_results() {
    let client = GeocoderClient::new(Arc::new(Failing));
    assert!(client.lookup("Mumbai").await.is_empty());
  }

  #[tokio::test]
  async fn coordinates_skip_the_network() {
    let geocoder = Arc::new(Counting::default());
    let client = GeocoderClient::new(geocoder.clone());
    let results = client.lookup("19.07, 72.90").await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].place_type, "coordinate");
    assert_eq!(geocoder.0.load(Ordering::SeqCst), 0);

    let results = client.lookup("Mumbai").await;
    assert_eq!(results[0].display_name, "Mumbai");
    assert_eq!(geocoder.0.load(Ordering::SeqCst), 1);
  }
}
