use chrono::{DateTime, Utc};
use egui::Color32;

use super::{FeatureStyle, OverlayFeature};
use crate::{
  dataset::FeatureCollection,
  map::{
    coordinates::WGS84Coordinate,
    icons::{GREEN, SEVERITY_RED},
  },
  records::{MapRecord, StatusClass, parse_timestamp},
};

const MIN_OPACITY: f64 = 0.1;
const FADE_DAYS: f64 = 365.;
const BASE_RADIUS_M: f64 = 50.;
const RADIUS_PER_DAY_M: f64 = 2.;

/// A past complaint with the time it was filed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoricalPoint {
  pub position: WGS84Coordinate,
  pub created_at: DateTime<Utc>,
  pub resolved: bool,
}

/// Reads points with a `createdAt` property from a historical snapshot.
#[must_use]
pub fn points_from_dataset(dataset: &FeatureCollection) -> Vec<HistoricalPoint> {
  dataset
    .features
    .iter()
    .filter_map(|f| {
      let position = f.geometry.point()?;
      let created_at = f
        .property_str("createdAt")
        .or_else(|| f.property_str("created_at"))
        .and_then(parse_timestamp)?;
      let resolved = f
        .property_str("status")
        .is_some_and(|s| StatusClass::classify(s) == StatusClass::Resolved);
      Some(HistoricalPoint {
        position,
        created_at,
        resolved,
      })
    })
    .collect()
}

/// Complaints that carry a creation time.
#[must_use]
pub fn points_from_records(records: &[MapRecord]) -> Vec<HistoricalPoint> {
  records
    .iter()
    .filter(|r| r.is_complaint())
    .filter_map(|r| {
      Some(HistoricalPoint {
        position: r.position,
        created_at: r.created_at?,
        resolved: r.status_class() == StatusClass::Resolved,
      })
    })
    .collect()
}

/// Opacity and radius (meters) of a point `age_days` old. Older points fade and grow.
#[must_use]
pub fn decay(age_days: f64) -> (f64, f64) {
  let age = age_days.max(0.);
  let opacity = (1. - age / FADE_DAYS).max(MIN_OPACITY);
  (opacity, BASE_RADIUS_M + RADIUS_PER_DAY_M * age)
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn age_days(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
  (now - created_at).num_seconds() as f64 / 86_400.
}

#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn historical_features(points: &[HistoricalPoint], now: DateTime<Utc>) -> Vec<OverlayFeature> {
  points
    .iter()
    .map(|p| {
      let (opacity, radius_m) = decay(age_days(p.created_at, now));
      let color: Color32 = if p.resolved { GREEN } else { SEVERITY_RED };
      let opacity = opacity as f32;
      OverlayFeature::Circle {
        center: p.position,
        radius_m,
        style: FeatureStyle {
          stroke: color.gamma_multiply(opacity),
          weight: 1.,
          dashed: false,
          fill: color.gamma_multiply(opacity * 0.5),
        },
      }
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use assert_approx_eq::assert_approx_eq;
  use chrono::Duration;

  fn point(days_ago: i64, now: DateTime<Utc>) -> HistoricalPoint {
    HistoricalPoint {
      position: WGS84Coordinate::new(19.07, 72.90),
      created_at: now - Duration::days(days_ago),
      resolved: false,
    }
  }

  #[test]
  fn older_points_fade_and_grow() {
    let now = Utc::now();
    let features = historical_features(&[point(10, now), point(200, now)], now);
    let (
      OverlayFeature::Circle {
        radius_m: newer_radius,
        style: newer,
        ..
      },
      OverlayFeature::Circle {
        radius_m: older_radius,
        style: older,
        ..
      },
    ) = (&features[0], &features[1])
    else {
      panic!("expected circles");
    };
    assert!(older_radius > newer_radius);
    assert!(older.fill.a() < newer.fill.a());
  }

  #[test]
  fn decay_is_floored() {
    let (opacity, radius) = decay(1000.);
    assert_approx_eq!(opacity, 0.1);
    assert_approx_eq!(radius, 2050.);
    let (opacity, radius) = decay(0.);
    assert_approx_eq!(opacity, 1.);
    assert_approx_eq!(radius, 50.);
  }

  #[test]
  fn reads_created_at_from_dataset() {
    let fc = FeatureCollection::from_json(&serde_json::json!({
      "type": "FeatureCollection",
      "features": [
        {"type": "Feature", "properties": {"createdAt": "2024-03-01T10:00:00Z", "status": "resolved"},
         "geometry": {"type": "Point", "coordinates": [72.9, 19.07]}},
        {"type": "Feature", "properties": {},
         "geometry": {"type": "Point", "coordinates": [72.9, 19.07]}}
      ]
    }))
    .unwrap();
    let points = points_from_dataset(&fc);
    assert_eq!(points.len(), 1);
    assert!(points[0].resolved);
  }
}
