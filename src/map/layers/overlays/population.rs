use egui::Color32;

use super::{FeatureStyle, OverlayFeature, boundary};
use crate::dataset::FeatureCollection;

/// Density breakpoints (people per km²), highest first.
pub const DENSITY_SCALE: [(f64, Color32); 5] = [
  (10_000., Color32::from_rgb(0x80, 0x00, 0x26)),
  (5_000., Color32::from_rgb(0xBD, 0x00, 0x26)),
  (2_000., Color32::from_rgb(0xE3, 0x1A, 0x1C)),
  (1_000., Color32::from_rgb(0xFC, 0x4E, 0x2A)),
  (500., Color32::from_rgb(0xFD, 0x8D, 0x3C)),
];

pub const LOW_DENSITY: Color32 = Color32::from_rgb(0xA1, 0xD9, 0x9B);

#[must_use]
pub fn density_color(density: f64) -> Color32 {
  DENSITY_SCALE
    .iter()
    .find(|(above, _)| density > *above)
    .map_or(LOW_DENSITY, |(_, color)| *color)
}

#[must_use]
pub fn population_features(dataset: &FeatureCollection) -> Vec<OverlayFeature> {
  dataset
    .features
    .iter()
    .flat_map(|f| {
      let density = f.property_f64("density").unwrap_or(0.);
      let style = FeatureStyle::outline(Color32::WHITE, 1.).with_fill(density_color(density), 0.7);
      boundary::polygons_with(f, style, &boundary::region_popup(f))
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use rstest::rstest;

  #[rstest]
  #[case(25_000., Color32::from_rgb(0x80, 0x00, 0x26))]
  #[case(10_000., Color32::from_rgb(0xBD, 0x00, 0x26))]
  #[case(1_500., Color32::from_rgb(0xFC, 0x4E, 0x2A))]
  #[case(600., Color32::from_rgb(0xFD, 0x8D, 0x3C))]
  #[case(499., LOW_DENSITY)]
  #[case(0., LOW_DENSITY)]
  fn density_buckets(#[case] density: f64, #[case] expected: Color32) {
    assert_eq!(density_color(density), expected);
  }
}
