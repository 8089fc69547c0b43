use std::path::PathBuf;

use dirs::home_dir;
use log::error;
use serde::{Deserialize, Serialize};

use crate::{
  map::{cluster::ClusterThresholds, coordinates::WGS84Coordinate, heat::HeatOptions},
  search::{GeocoderConfig, ui::LocationSearchOptions},
};

pub const DEFAULT_API_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterSettings {
  pub radius_px: f64,
  pub max_zoom: u8,
  pub thresholds: ClusterThresholds,
}

impl Default for ClusterSettings {
  fn default() -> Self {
    Self {
      radius_px: 80.,
      max_zoom: 18,
      thresholds: ClusterThresholds::default(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  pub config_path: Option<PathBuf>,
  pub api_base_url: Option<String>,
  pub tile_cache_dir: Option<PathBuf>,
  pub geocoder: Option<GeocoderConfig>,
  pub cluster: ClusterSettings,
  pub heat: HeatOptions,
  pub recenter_threshold_m: f64,
  pub search: LocationSearchOptions,
  pub initial_center: WGS84Coordinate,
  pub initial_zoom: f64,
}

impl Config {
  /// Environment over `config.json` over built-in defaults. Writes the merged config on first
  /// run.
  #[must_use]
  pub fn new() -> Self {
    let from_env = Self::from_env();
    let from_file = Self::from_file();
    let default = Self::default();

    let mut merged = from_env;
    if let Some(from_file) = &from_file {
      merged = merged.merge(from_file);
    }
    merged = merged.merge(&default);

    if merged.config_path.is_some() && from_file.is_none() {
      merged.init_cfg_file();
    }

    merged
  }

  #[must_use]
  pub fn api_base_url(&self) -> &str {
    self.api_base_url.as_deref().unwrap_or(DEFAULT_API_URL)
  }

  #[must_use]
  pub fn geocoder(&self) -> GeocoderConfig {
    self.geocoder.clone().unwrap_or_default()
  }

  fn config_dir() -> Option<PathBuf> {
    std::env::var("CIVICMAP_CONFIG")
      .ok()
      .map(PathBuf::from)
      .or_else(|| home_dir().map(|p| p.join(".config").join("civicmap")))
  }

  fn from_env() -> Self {
    Self {
      config_path: std::env::var("CIVICMAP_CONFIG").ok().map(PathBuf::from),
      api_base_url: std::env::var("CIVICMAP_API_URL").ok(),
      tile_cache_dir: std::env::var("CIVICMAP_TILE_CACHE_DIR")
        .ok()
        .map(PathBuf::from),
      ..Self::unset()
    }
  }

  /// Every optional field empty, every value at its default.
  fn unset() -> Self {
    Self {
      config_path: None,
      api_base_url: None,
      tile_cache_dir: None,
      geocoder: None,
      ..Self::default()
    }
  }

  fn merge(mut self, other: &Self) -> Self {
    let default = Self::default();
    self.config_path = self.config_path.or(other.config_path.clone());
    self.api_base_url = self.api_base_url.or(other.api_base_url.clone());
    self.tile_cache_dir = self.tile_cache_dir.or(other.tile_cache_dir.clone());
    self.geocoder = self.geocoder.or(other.geocoder.clone());

    // Plain values: keep ours unless it is still the default.
    if self.cluster == default.cluster {
      self.cluster = other.cluster;
    }
    if self.heat == default.heat {
      self.heat = other.heat.clone();
    }
    if (self.recenter_threshold_m - default.recenter_threshold_m).abs() < f64::EPSILON {
      self.recenter_threshold_m = other.recenter_threshold_m;
    }
    if self.search == default.search {
      self.search = other.search;
    }
    if self.initial_center == default.initial_center {
      self.initial_center = other.initial_center;
    }
    if (self.initial_zoom - default.initial_zoom).abs() < f64::EPSILON {
      self.initial_zoom = other.initial_zoom;
    }

    self
  }

  fn from_file() -> Option<Self> {
    let config_path = Self::config_dir()?.join("config.json");
    Self::parse(&std::fs::read_to_string(&config_path).ok()?)
  }

  fn parse(json: &str) -> Option<Self> {
    serde_json::from_str(json)
      .inspect_err(|e| error!("Failed to read config file: {e}"))
      .ok()
  }

  fn init_cfg_file(&self) {
    if let Some(path) = &self.config_path
      && !path.exists()
    {
      let _ = std::fs::create_dir_all(path).inspect_err(|e| {
        error!("Failed to create config directory: {e}");
      });
    }

    if let Some(path) = &self.tile_cache_dir
      && !path.exists()
    {
      let _ = std::fs::create_dir_all(path).inspect_err(|e| {
        error!("Failed to create tile cache directory: {e}");
      });
    }

    if let Some(path) = &self.config_path {
      let path = path.join("config.json");
      if !path.exists() {
        match serde_json::to_string_pretty(self) {
          Ok(config) => {
            let _ = std::fs::write(path, config).inspect_err(|e| {
              error!("Failed to write config file: {e}");
            });
          }
          Err(e) => error!("Failed to serialize config: {e}"),
        }
      }
    }
  }
}

impl Default for Config {
  fn default() -> Self {
    Self {
      config_path: Self::config_dir(),
      api_base_url: Some(DEFAULT_API_URL.to_string()),
      tile_cache_dir: home_dir().map(|p| p.join(".civicmap_tile_cache")),
      geocoder: Some(GeocoderConfig::Backend),
      cluster: ClusterSettings::default(),
      heat: HeatOptions::default(),
      recenter_threshold_m: 500.,
      search: LocationSearchOptions::default(),
      initial_center: WGS84Coordinate::new(19.076, 72.8777),
      initial_zoom: 12.,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults() {
    let config = Config::default();
    assert_eq!(config.api_base_url(), DEFAULT_API_URL);
    assert_eq!(config.geocoder(), GeocoderConfig::Backend);
    assert!((config.cluster.radius_px - 80.).abs() < f64::EPSILON);
    assert_eq!(config.cluster.max_zoom, 18);
    assert_eq!(config.cluster.thresholds.large_above, 10);
    assert!((config.recenter_threshold_m - 500.).abs() < f64::EPSILON);
    assert_eq!(config.search.min_chars, 3);
  }

  #[test]
  fn partial_file_keeps_defaults() {
    let file = Config::parse(
      r#"{"api_base_url": "https://civic.example.org", "cluster": {"radius_px": 60.0}}"#,
    )
    .unwrap();
    let merged = Config::unset().merge(&file).merge(&Config::default());
    assert_eq!(merged.api_base_url(), "https://civic.example.org");
    assert!((merged.cluster.radius_px - 60.).abs() < f64::EPSILON);
    assert_eq!(merged.cluster.max_zoom, 18);
    assert_eq!(merged.cluster.thresholds.medium_above, 5);
    assert_eq!(merged.search, LocationSearchOptions::default());
  }

  #[test]
  fn earlier_layer_wins() {
    let env = Config {
      api_base_url: Some("http://env".to_string()),
      ..Config::unset()
    };
    let file = Config {
      api_base_url: Some("http://file".to_string()),
      geocoder: Some(GeocoderConfig::Nominatim { base_url: None }),
      recenter_threshold_m: 250.,
      ..Config::unset()
    };
    let merged = env.merge(&file).merge(&Config::default());
    assert_eq!(merged.api_base_url(), "http://env");
    assert_eq!(merged.geocoder(), GeocoderConfig::Nominatim { base_url: None });
    assert!((merged.recenter_threshold_m - 250.).abs() < f64::EPSILON);
  }

  #[test]
  fn broken_file_is_ignored() {
    assert!(Config::parse("{not json").is_none());
  }
}
