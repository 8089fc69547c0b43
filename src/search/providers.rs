use super::{GeocodeError, GeocodeResult, Geocoder};
use regex::Regex;
use serde_json::Value;

const USER_AGENT: &str = concat!("civicmap/", env!("CARGO_PKG_VERSION"));

/// Turns typed coordinates into a result without asking any service.
pub struct CoordinateParser {
  decimal_regex: Regex,
  dms_regex: Regex,
}

impl Default for CoordinateParser {
  fn default() -> Self {
    Self::new()
  }
}

impl CoordinateParser {
  /// # Panics
  /// Never, the patterns are constant.
  #[must_use]
  pub fn new() -> Self {
    Self {
      // "19.07, 72.87", "19.07,72.87" or "19.07 72.87"
      decimal_regex: Regex::new(r"^\s*(-?\d+\.?\d*)\s*[,\s]\s*(-?\d+\.?\d*)\s*$")
        .expect("valid decimal pattern"),
      // "19°04'N 72°52'E" or "19° 04' N, 72° 52' E"
      dms_regex: Regex::new(r"^\s*(\d+)°\s*(\d+)'\s*([NS])\s*[,\s]\s*(\d+)°\s*(\d+)'\s*([EW])\s*$")
        .expect("valid dms pattern"),
    }
  }

  #[must_use]
  pub fn parse_coordinate(&self, input: &str) -> Option<GeocodeResult> {
    let (lat, lon) = self.parse_decimal(input).or_else(|| self.parse_dms(input))?;
    Some(GeocodeResult {
      place_id: format!("coordinate:{lat:.6},{lon:.6}"),
      display_name: format!("{lat:.4}°, {lon:.4}°"),
      lat,
      lon,
      place_type: "coordinate".to_string(),
    })
  }

  fn parse_decimal(&self, input: &str) -> Option<(f64, f64)> {
    let caps = self.decimal_regex.captures(input)?;
    let lat: f64 = caps.get(1)?.as_str().parse().ok()?;
    let lon: f64 = caps.get(2)?.as_str().parse().ok()?;
    in_range(lat, lon).then_some((lat, lon))
  }

  fn parse_dms(&self, input: &str) -> Option<(f64, f64)> {
    let caps = self.dms_regex.captures(input)?;
    let part = |i| caps.get(i).and_then(|m| m.as_str().parse::<f64>().ok());
    let mut lat = part(1)? + part(2)? / 60.;
    let mut lon = part(4)? + part(5)? / 60.;
    if caps.get(3)?.as_str() == "S" {
      lat = -lat;
    }
    if caps.get(6)?.as_str() == "W" {
      lon = -lon;
    }
    in_range(lat, lon).then_some((lat, lon))
  }
}

fn in_range(lat: f64, lon: f64) -> bool {
  (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

fn number(value: &Value) -> Option<f64> {
  value
    .as_f64()
    .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
    .filter(|v: &f64| v.is_finite())
}

/// Reads one geocoder hit. Coordinates may arrive as numbers or numeric strings; hits
/// outside the valid coordinate range are dropped.
#[must_use]
pub fn result_from_value(item: &Value) -> Option<GeocodeResult> {
  let lat = number(&item["lat"])?;
  let lon = number(&item["lon"])?;
  if !in_range(lat, lon) {
    log::debug!("Dropping geocode hit outside the coordinate range: {lat}, {lon}");
    return None;
  }
  let display_name = item["display_name"].as_str()?.to_string();
  let place_id = match &item["place_id"] {
    Value::String(s) => s.clone(),
    Value::Number(n) => n.to_string(),
    _ => display_name.clone(),
  };
  let place_type = item["type"]
    .as_str()
    .or_else(|| item["addresstype"].as_str())
    .unwrap_or_default()
    .to_string();
  Some(GeocodeResult {
    place_id,
    display_name,
    lat,
    lon,
    place_type,
  })
}

fn results_from_value(response: &Value) -> Vec<GeocodeResult> {
  response
    .as_array()
    .map(|items| items.iter().filter_map(result_from_value).collect())
    .unwrap_or_default()
}

async fn get_json(client: &surf::Client, url: &str) -> Result<Value, GeocodeError> {
  let mut response = client
    .get(url)
    .header("User-Agent", USER_AGENT)
    .await
    .map_err(|e| GeocodeError::Transport(e.to_string()))?;
  let status = u16::from(response.status());
  if status != 200 {
    return Err(GeocodeError::Status(status));
  }
  response
    .body_json::<Value>()
    .await
    .map_err(|e| GeocodeError::Decode(e.to_string()))
}

/// The application backend's geocoding endpoint, `GET {base}/api/geocode?q=`.
pub struct BackendGeocoder {
  base_url: String,
  client: surf::Client,
}

impl BackendGeocoder {
  #[must_use]
  pub fn new(base_url: &str) -> Self {
    Self {
      base_url: base_url.trim_end_matches('/').to_string(),
      client: surf::Client::new(),
    }
  }

  #[must_use]
  pub fn url_for(&self, query: &str) -> String {
    format!("{}/api/geocode?q={}", self.base_url, urlencoding::encode(query))
  }
}

#[async_trait::async_trait]
impl Geocoder for BackendGeocoder {
  fn name(&self) -> &'static str {
    "Backend geocoder"
  }

  async fn lookup(&self, query: &str) -> Result<Vec<GeocodeResult>, GeocodeError> {
    let response = get_json(&self.client, &self.url_for(query)).await?;
    Ok(results_from_value(&response))
  }
}

/// OpenStreetMap Nominatim.
pub struct NominatimGeocoder {
  base_url: String,
  client: surf::Client,
}

impl NominatimGeocoder {
  #[must_use]
  pub fn new(base_url: Option<String>) -> Self {
    Self {
      base_url: base_url.unwrap_or_else(|| "https://nominatim.openstreetmap.org".to_string()),
      client: surf::Client::new(),
    }
  }
}

#[async_trait::async_trait]
impl Geocoder for NominatimGeocoder {
  fn name(&self) -> &'static str {
    "OpenStreetMap Nominatim"
  }

  async fn lookup(&self, query: &str) -> Result<Vec<GeocodeResult>, GeocodeError> {
    let url = format!(
      "{}/search?format=json&limit=5&q={}",
      self.base_url,
      urlencoding::encode(query)
    );
    let response = get_json(&self.client, &url).await?;
    Ok(results_from_value(&response))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use assert_approx_eq::assert_approx_eq;
  use serde_json::json;

  #[test]
  fn coordinate_formats() {
    let parser = CoordinateParser::new();
    assert!(parser.parse_coordinate("19.07, 72.87").is_some());
    assert!(parser.parse_coordinate("19.07,72.87").is_some());
    assert!(parser.parse_coordinate("19.07 72.87").is_some());
    assert!(parser.parse_coordinate("-33.9, -70.6").is_some());
    assert!(parser.parse_coordinate("19°04'N 72°52'E").is_some());
    assert!(parser.parse_coordinate("Mumbai").is_none());
    assert!(parser.parse_coordinate("200, 13.4").is_none());
    assert!(parser.parse_coordinate("52.5, 200").is_none());
  }

  #[test]
  fn dms_hemispheres() {
    let parser = CoordinateParser::new();
    let result = parser.parse_coordinate("33°30'S, 70°36'W").unwrap();
    assert_approx_eq!(result.lat, -33.5);
    assert_approx_eq!(result.lon, -70.6);
    assert_eq!(result.place_type, "coordinate");
    assert_approx_eq!(result.zoom_level(), 15.);
  }

  #[test]
  fn results_accept_string_and_number_coordinates() {
    let response = json!([
      {"place_id": 42, "display_name": "Mumbai, Maharashtra", "lat": "19.07", "lon": "72.87", "type": "city"},
      {"place_id": "b", "display_name": "Maharashtra", "lat": 19.6, "lon": 75.5, "addresstype": "state"},
      {"display_name": "broken", "lat": "north"}
    ]);
    let results = results_from_value(&response);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].place_id, "42");
    assert_approx_eq!(results[0].lat, 19.07);
    assert_approx_eq!(results[0].zoom_level(), 12.);
    assert_eq!(results[1].place_type, "state");
    assert_approx_eq!(results[1].zoom_level(), 7.);
  }

  #[rstest::rstest]
  #[case(json!("NaN"), json!("72.87"))]
  #[case(json!("inf"), json!(72.87))]
  #[case(json!(91.0), json!(72.87))]
  #[case(json!("19.07"), json!(-180.5))]
  fn results_outside_the_coordinate_range_are_dropped(#[case] lat: Value, #[case] lon: Value) {
    let hit = json!({"place_id": 1, "display_name": "Nowhere", "lat": lat, "lon": lon});
    assert!(result_from_value(&hit).is_none());
  }

  #[test]
  fn non_array_response_is_empty() {
    assert!(results_from_value(&json!({"error": "nope"})).is_empty());
  }

  #[test]
  fn backend_url_is_encoded() {
    let geocoder = BackendGeocoder::new("http://localhost:8080/");
    assert_eq!(
      geocoder.url_for("Bandra West"),
      "http://localhost:8080/api/geocode?q=Bandra%20West"
    );
  }
}
