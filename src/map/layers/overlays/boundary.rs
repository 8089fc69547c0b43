use egui::Color32;

use super::{FeatureStyle, OverlayFeature, Popup, format_number};
use crate::dataset::{Feature, FeatureCollection, FeatureGeometry};

const BOUNDARY_COLOR: Color32 = Color32::from_rgb(51, 136, 255);

#[must_use]
pub fn boundary_style() -> FeatureStyle {
  FeatureStyle::outline(BOUNDARY_COLOR, 2.)
    .with_dashes()
    .with_fill(BOUNDARY_COLOR, 0.1)
}

/// Popup listing the administrative attributes a ward carries.
pub(crate) fn region_popup(feature: &Feature) -> Popup {
  let title = feature
    .property_display("name")
    .or_else(|| feature.property_display("ward"))
    .unwrap_or_else(|| "Ward".to_string());
  Popup::new(title)
    .row(
      "Population",
      feature.property_f64("population").map(format_number),
    )
    .row("Area", feature.property_display("area"))
    .row("Density", feature.property_f64("density").map(format_number))
}

/// Splits polygon and multipolygon features into drawable polygons sharing `style`.
pub(crate) fn polygons_with(
  feature: &Feature,
  style: FeatureStyle,
  popup: &Popup,
) -> Vec<OverlayFeature> {
  let rings = match &feature.geometry {
    FeatureGeometry::Polygon(rings) => vec![rings.clone()],
    FeatureGeometry::MultiPolygon(polys) => polys.clone(),
    _ => Vec::new(),
  };
  rings
    .into_iter()
    .filter(|rings| rings.first().is_some_and(|outer| outer.len() >= 3))
    .map(|rings| OverlayFeature::Polygon {
      rings,
      style,
      popup: Some(popup.clone()),
    })
    .collect()
}

#[must_use]
pub fn boundary_features(dataset: &FeatureCollection) -> Vec<OverlayFeature> {
  dataset
    .features
    .iter()
    .flat_map(|f| polygons_with(f, boundary_style(), &region_popup(f)))
    .collect()
}
