use egui::Color32;
use rand::{RngExt, rngs::ThreadRng};

use super::{FeatureStyle, OverlayFeature, Popup};
use crate::{dataset::FeatureCollection, map::coordinates::WGS84Coordinate};

/// Congestion on one road segment, `0` free flowing to `1` standstill.
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficReading {
  pub name: String,
  pub path: Vec<WGS84Coordinate>,
  pub congestion: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CongestionLevel {
  Light,
  Medium,
  Heavy,
}

impl CongestionLevel {
  #[must_use]
  pub fn from_congestion(congestion: f64) -> Self {
    if congestion > 0.7 {
      CongestionLevel::Heavy
    } else if congestion > 0.4 {
      CongestionLevel::Medium
    } else {
      CongestionLevel::Light
    }
  }

  #[must_use]
  pub fn color(self) -> Color32 {
    match self {
      CongestionLevel::Heavy => Color32::from_rgb(220, 38, 38),
      CongestionLevel::Medium => Color32::from_rgb(249, 115, 22),
      CongestionLevel::Light => Color32::from_rgb(34, 197, 94),
    }
  }

  #[must_use]
  pub fn name(self) -> &'static str {
    match self {
      CongestionLevel::Heavy => "heavy",
      CongestionLevel::Medium => "medium",
      CongestionLevel::Light => "light",
    }
  }
}

/// A source of per-segment congestion readings, real or simulated.
pub trait TrafficFeed {
  fn readings(&mut self) -> Vec<TrafficReading>;
}

/// Assigns random congestion to a fixed set of road segments.
pub struct SimulatedTrafficFeed {
  roads: Vec<(String, Vec<WGS84Coordinate>)>,
  rng: ThreadRng,
}

impl SimulatedTrafficFeed {
  #[must_use]
  pub fn new(roads: Vec<(String, Vec<WGS84Coordinate>)>) -> Self {
    Self {
      roads,
      rng: rand::rng(),
    }
  }

  /// Uses the `road` lines of an infrastructure network as segments.
  #[must_use]
  pub fn from_infrastructure(dataset: &FeatureCollection) -> Self {
    let roads = dataset
      .features
      .iter()
      .filter(|f| f.property_str("type").is_some_and(|t| t.eq_ignore_ascii_case("road")))
      .flat_map(|f| {
        let name = f.property_display("name").unwrap_or_else(|| "Road".to_string());
        f.geometry
          .lines()
          .into_iter()
          .map(move |path| (name.clone(), path.to_vec()))
          .collect::<Vec<_>>()
      })
      .collect();
    Self::new(roads)
  }
}

impl TrafficFeed for SimulatedTrafficFeed {
  fn readings(&mut self) -> Vec<TrafficReading> {
    self
      .roads
      .iter()
      .map(|(name, path)| TrafficReading {
        name: name.clone(),
        path: path.clone(),
        congestion: self.rng.random_range(0.0..1.0),
      })
      .collect()
  }
}

/// Readings from line features carrying a `congestion` property.
#[must_use]
pub fn readings_from_dataset(dataset: &FeatureCollection) -> Vec<TrafficReading> {
  dataset
    .features
    .iter()
    .filter_map(|f| Some((f, f.property_f64("congestion")?.clamp(0., 1.))))
    .flat_map(|(f, congestion)| {
      let name = f.property_display("name").unwrap_or_else(|| "Road".to_string());
      f.geometry
        .lines()
        .into_iter()
        .map(move |path| TrafficReading {
          name: name.clone(),
          path: path.to_vec(),
          congestion,
        })
        .collect::<Vec<_>>()
    })
    .collect()
}

#[must_use]
pub fn traffic_features(readings: &[TrafficReading]) -> Vec<OverlayFeature> {
  readings
    .iter()
    .filter(|r| r.path.len() >= 2)
    .map(|r| {
      let level = CongestionLevel::from_congestion(r.congestion);
      OverlayFeature::Polyline {
        path: r.path.clone(),
        style: FeatureStyle::outline(level.color(), 5.),
        popup: Some(
          Popup::new(r.name.clone())
            .row("Congestion", Some(level.name().to_string()))
            .row("Load", Some(format!("{:.0}%", r.congestion * 100.))),
        ),
      }
    })
    .collect()
}
