use egui::Color32;

use super::{FeatureStyle, OverlayFeature, Popup};
use crate::dataset::FeatureCollection;

#[must_use]
pub fn network_color(network: &str) -> Color32 {
  match network.to_lowercase().as_str() {
    "road" => Color32::from_rgb(71, 85, 105),
    "water" => Color32::from_rgb(59, 130, 246),
    "power" => Color32::from_rgb(234, 179, 8),
    "sewer" => Color32::from_rgb(34, 197, 94),
    _ => Color32::GRAY,
  }
}

#[must_use]
pub fn infrastructure_features(dataset: &FeatureCollection) -> Vec<OverlayFeature> {
  dataset
    .features
    .iter()
    .flat_map(|f| {
      let network = f.property_str("type").unwrap_or("unknown");
      let style = FeatureStyle::outline(network_color(network), 3.);
      let popup = Popup::new(
        f.property_display("name")
          .unwrap_or_else(|| network.to_string()),
      )
      .row("Type", Some(network.to_string()))
      .row("Status", f.property_display("status"));
      f.geometry
        .lines()
        .into_iter()
        .filter(|path| path.len() >= 2)
        .map(|path| OverlayFeature::Polyline {
          path: path.to_vec(),
          style,
          popup: Some(popup.clone()),
        })
        .collect::<Vec<_>>()
    })
    .collect()
}
