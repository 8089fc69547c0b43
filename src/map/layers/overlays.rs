use egui::Color32;
use serde::{Deserialize, Serialize};

use crate::map::coordinates::{BoundingBox, WGS84Coordinate};

/// Ward polygons with dashed outlines.
pub mod boundary;
/// Time-decayed complaint circles.
pub mod historical;
/// Infrastructure networks colored by type.
pub mod infrastructure;
/// Population density choropleth.
pub mod population;
/// Road congestion readings.
pub mod traffic;
/// Weather snapshot panel.
pub mod weather;

/// The thematic layers that can be toggled on top of the base layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayKind {
  Boundaries,
  Population,
  Infrastructure,
  Historical,
  Weather,
  Traffic,
}

impl OverlayKind {
  pub const ALL: [OverlayKind; 6] = [
    OverlayKind::Boundaries,
    OverlayKind::Population,
    OverlayKind::Infrastructure,
    OverlayKind::Historical,
    OverlayKind::Weather,
    OverlayKind::Traffic,
  ];

  #[must_use]
  pub fn name(self) -> &'static str {
    match self {
      OverlayKind::Boundaries => "Ward Boundaries",
      OverlayKind::Population => "Population Density",
      OverlayKind::Infrastructure => "Infrastructure",
      OverlayKind::Historical => "Historical Data",
      OverlayKind::Weather => "Weather",
      OverlayKind::Traffic => "Traffic",
    }
  }
}

/// Stroke and fill of an overlay feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureStyle {
  pub stroke: Color32,
  pub weight: f32,
  pub dashed: bool,
  pub fill: Color32,
}

impl FeatureStyle {
  #[must_use]
  pub fn outline(stroke: Color32, weight: f32) -> Self {
    Self {
      stroke,
      weight,
      dashed: false,
      fill: Color32::TRANSPARENT,
    }
  }

  #[must_use]
  pub fn with_fill(mut self, color: Color32, opacity: f32) -> Self {
    self.fill = color.gamma_multiply(opacity);
    self
  }

  #[must_use]
  pub fn with_dashes(mut self) -> Self {
    self.dashed = true;
    self
  }

  /// Hover affordance. Derived on the fly and never stored on the feature.
  #[must_use]
  pub fn hovered(&self) -> Self {
    let alpha = f32::from(self.fill.a()) / 255.;
    let boost = if alpha > 0. {
      ((alpha + 0.2).min(0.9)) / alpha
    } else {
      1.
    };
    Self {
      stroke: self.stroke,
      weight: self.weight + 2.,
      dashed: false,
      fill: self.fill.gamma_multiply(boost.min(4.)),
    }
  }
}

/// Content of the popup shown when a feature is clicked.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Popup {
  pub title: String,
  pub rows: Vec<(String, String)>,
}

impl Popup {
  #[must_use]
  pub fn new(title: impl Into<String>) -> Self {
    Self {
      title: title.into(),
      rows: Vec::new(),
    }
  }

  /// Adds a row if a value is present.
  #[must_use]
  pub fn row(mut self, label: &str, value: Option<String>) -> Self {
    if let Some(value) = value {
      self.rows.push((label.to_string(), value));
    }
    self
  }
}

/// A drawable unit of an overlay.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayFeature {
  Polygon {
    rings: Vec<Vec<WGS84Coordinate>>,
    style: FeatureStyle,
    popup: Option<Popup>,
  },
  Polyline {
    path: Vec<WGS84Coordinate>,
    style: FeatureStyle,
    popup: Option<Popup>,
  },
  /// A circle with a geographic radius.
  Circle {
    center: WGS84Coordinate,
    radius_m: f64,
    style: FeatureStyle,
  },
  /// A fixed screen panel, independent of the camera.
  Panel { title: String, lines: Vec<String> },
}

impl OverlayFeature {
  #[must_use]
  pub fn popup(&self) -> Option<&Popup> {
    match self {
      OverlayFeature::Polygon { popup, .. } | OverlayFeature::Polyline { popup, .. } => {
        popup.as_ref()
      }
      _ => None,
    }
  }

  #[must_use]
  pub fn style(&self) -> Option<&FeatureStyle> {
    match self {
      OverlayFeature::Polygon { style, .. }
      | OverlayFeature::Polyline { style, .. }
      | OverlayFeature::Circle { style, .. } => Some(style),
      OverlayFeature::Panel { .. } => None,
    }
  }

  #[must_use]
  pub fn bounding_box(&self) -> Option<BoundingBox> {
    match self {
      OverlayFeature::Polygon { rings, .. } => {
        Some(BoundingBox::from_iterator(rings.iter().flatten().copied()))
      }
      OverlayFeature::Polyline { path, .. } => {
        Some(BoundingBox::from_iterator(path.iter().copied()))
      }
      OverlayFeature::Circle { center, .. } => Some(BoundingBox::from_iterator([*center])),
      OverlayFeature::Panel { .. } => None,
    }
  }
}

pub(crate) fn format_number(value: f64) -> String {
  if (value - value.round()).abs() < f64::EPSILON {
    format!("{value:.0}")
  } else {
    format!("{value:.2}")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hover_is_heavier_and_more_opaque() {
    let style = FeatureStyle::outline(Color32::BLUE, 2.)
      .with_dashes()
      .with_fill(Color32::BLUE, 0.1);
    let hovered = style.hovered();
    assert!(hovered.weight > style.weight);
    assert!(hovered.fill.a() > style.fill.a());
    assert_eq!(style.hovered(), hovered);
  }

  #[test]
  fn popup_skips_missing_rows() {
    let popup = Popup::new("Ward A")
      .row("Population", Some("12000".to_string()))
      .row("Area", None);
    assert_eq!(popup.rows.len(), 1);
  }
}
