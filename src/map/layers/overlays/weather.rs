use rand::{RngExt, rngs::ThreadRng};
use serde::{Deserialize, Serialize};

use super::OverlayFeature;

const CONDITIONS: [&str; 5] = ["Sunny", "Partly Cloudy", "Cloudy", "Light Rain", "Humid"];

/// Current conditions shown by the weather overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
  pub temperature_c: f64,
  pub condition: String,
  pub humidity_pct: f64,
  pub wind_kmh: f64,
}

/// A source of weather snapshots, real or simulated.
pub trait WeatherFeed {
  fn snapshot(&mut self) -> Option<WeatherSnapshot>;
}

/// Plausible coastal conditions, re-rolled on every snapshot.
pub struct SimulatedWeatherFeed {
  rng: ThreadRng,
}

impl Default for SimulatedWeatherFeed {
  fn default() -> Self {
    Self { rng: rand::rng() }
  }
}

impl WeatherFeed for SimulatedWeatherFeed {
  fn snapshot(&mut self) -> Option<WeatherSnapshot> {
    Some(WeatherSnapshot {
      temperature_c: self.rng.random_range(24.0..34.0_f64).round(),
      condition: CONDITIONS[self.rng.random_range(0..CONDITIONS.len())].to_string(),
      humidity_pct: self.rng.random_range(55.0..90.0_f64).round(),
      wind_kmh: self.rng.random_range(5.0..25.0_f64).round(),
    })
  }
}

#[must_use]
pub fn weather_features(snapshot: &WeatherSnapshot) -> Vec<OverlayFeature> {
  vec![OverlayFeature::Panel {
    title: "Weather".to_string(),
    lines: vec![
      format!("{:.0}°C, {}", snapshot.temperature_c, snapshot.condition),
      format!("Humidity: {:.0}%", snapshot.humidity_pct),
      format!("Wind: {:.0} km/h", snapshot.wind_kmh),
    ],
  }]
}
