use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use super::surface::{LayerContent, LayerKey, MapSurface};
use crate::{dataset::FeatureCollection, records::MapRecord};

/// The switchable background tile sources.
mod base;
/// The thematic overlays.
mod overlays;
/// Draws the base layer tiles.
pub mod tile_layer;

pub use base::BaseLayer;
pub use overlays::{
  FeatureStyle, OverlayFeature, OverlayKind, Popup, boundary, historical, infrastructure,
  population, traffic, weather,
};

use overlays::{
  traffic::{TrafficFeed, TrafficReading},
  weather::{WeatherFeed, WeatherSnapshot},
};

/// Geographic datasets handed to the map by the host application. Every field is optional;
/// an overlay without data mounts empty.
#[derive(Debug, Clone, Default)]
pub struct OverlayDatasets {
  pub boundaries: Option<FeatureCollection>,
  pub population: Option<FeatureCollection>,
  pub infrastructure: Option<FeatureCollection>,
  pub historical: Option<FeatureCollection>,
  pub weather: Option<WeatherSnapshot>,
  pub traffic: Option<Vec<TrafficReading>>,
}

/// Mounts the base layer and the active overlays onto the map surface.
#[derive(Default)]
pub struct LayerProvider {
  datasets: OverlayDatasets,
  weather_feed: Option<Box<dyn WeatherFeed>>,
  traffic_feed: Option<Box<dyn TrafficFeed>>,
}

impl LayerProvider {
  #[must_use]
  pub fn new(datasets: OverlayDatasets) -> Self {
    Self {
      datasets,
      weather_feed: None,
      traffic_feed: None,
    }
  }

  /// Feed consulted when no weather snapshot was supplied.
  #[must_use]
  pub fn with_weather_feed(mut self, feed: impl WeatherFeed + 'static) -> Self {
    self.weather_feed = Some(Box::new(feed));
    self
  }

  /// Feed consulted when no traffic readings were supplied.
  #[must_use]
  pub fn with_traffic_feed(mut self, feed: impl TrafficFeed + 'static) -> Self {
    self.traffic_feed = Some(Box::new(feed));
    self
  }

  /// Builds the features of one overlay from its dataset.
  pub fn overlay_features(
    &mut self,
    kind: OverlayKind,
    records: &[MapRecord],
    now: DateTime<Utc>,
  ) -> Vec<OverlayFeature> {
    let datasets = &self.datasets;
    match kind {
      OverlayKind::Boundaries => datasets
        .boundaries
        .as_ref()
        .map(boundary::boundary_features)
        .unwrap_or_default(),
      OverlayKind::Population => datasets
        .population
        .as_ref()
        .map(population::population_features)
        .unwrap_or_default(),
      OverlayKind::Infrastructure => datasets
        .infrastructure
        .as_ref()
        .map(infrastructure::infrastructure_features)
        .unwrap_or_default(),
      OverlayKind::Historical => {
        let points = match &datasets.historical {
          Some(dataset) => historical::points_from_dataset(dataset),
          None => historical::points_from_records(records),
        };
        historical::historical_features(&points, now)
      }
      OverlayKind::Weather => datasets
        .weather
        .clone()
        .or_else(|| self.weather_feed.as_mut()?.snapshot())
        .map(|s| weather::weather_features(&s))
        .unwrap_or_default(),
      OverlayKind::Traffic => {
        let readings = match &datasets.traffic {
          Some(readings) => readings.clone(),
          None => self
            .traffic_feed
            .as_mut()
            .map(|feed| feed.readings())
            .unwrap_or_default(),
        };
        traffic::traffic_features(&readings)
      }
    }
  }

  /// Brings the surface in line with the selected base layer and the active overlays. The base
  /// layer and each overlay are added and removed independently of each other.
  pub fn sync(
    &mut self,
    surface: &mut MapSurface,
    base: BaseLayer,
    active: &BTreeSet<OverlayKind>,
    records: &[MapRecord],
    now: DateTime<Utc>,
  ) {
    if surface.base_layer() != Some(base) {
      surface.add(LayerKey::Base, LayerContent::Tiles(base));
    }
    for kind in OverlayKind::ALL {
      let key = LayerKey::Overlay(kind);
      match (active.contains(&kind), surface.contains(key)) {
        (true, false) => {
          let features = self.overlay_features(kind, records, now);
          if features.is_empty() {
            log::debug!("No data for overlay {}", kind.name());
          }
          surface.add(key, LayerContent::Features(features));
        }
        (false, true) => {
          surface.remove(key);
        }
        _ => {}
      }
    }
  }

  /// Rebuilds mounted overlays that depend on the record set.
  pub fn refresh_records(
    &mut self,
    surface: &mut MapSurface,
    records: &[MapRecord],
    now: DateTime<Utc>,
  ) {
    let key = LayerKey::Overlay(OverlayKind::Historical);
    if surface.contains(key) && self.datasets.historical.is_none() {
      let features = self.overlay_features(OverlayKind::Historical, records, now);
      surface.add(key, LayerContent::Features(features));
    }
  }
}
