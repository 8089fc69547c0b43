//! Legend keys for the active overlays and the layer switch menu.

use std::collections::BTreeSet;

use egui::Color32;

use crate::map::{
  icons::{GREEN, SEVERITY_RED},
  layers::{
    BaseLayer, OverlayKind,
    boundary::boundary_style,
    infrastructure::network_color,
    population::{DENSITY_SCALE, LOW_DENSITY},
    traffic::CongestionLevel,
  },
};

#[derive(Debug, Clone, PartialEq)]
pub struct LegendSwatch {
  pub color: Color32,
  pub label: String,
}

impl LegendSwatch {
  fn new(color: Color32, label: impl Into<String>) -> Self {
    Self {
      color,
      label: label.into(),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
  pub overlay: OverlayKind,
  pub swatches: Vec<LegendSwatch>,
}

fn swatches(overlay: OverlayKind) -> Vec<LegendSwatch> {
  match overlay {
    OverlayKind::Boundaries => vec![LegendSwatch::new(boundary_style().stroke, "Ward boundary")],
    OverlayKind::Population => {
      let mut swatches: Vec<LegendSwatch> = DENSITY_SCALE
        .iter()
        .map(|(above, color)| LegendSwatch::new(*color, format!("> {above:.0} / km²")))
        .collect();
      swatches.push(LegendSwatch::new(LOW_DENSITY, "< 500 / km²"));
      swatches
    }
    OverlayKind::Infrastructure => ["road", "water", "power", "sewer"]
      .into_iter()
      .map(|network| {
        let mut label = network.to_string();
        label[..1].make_ascii_uppercase();
        LegendSwatch::new(network_color(network), label)
      })
      .collect(),
    OverlayKind::Historical => vec![
      LegendSwatch::new(GREEN, "Resolved"),
      LegendSwatch::new(SEVERITY_RED, "Unresolved"),
      LegendSwatch::new(SEVERITY_RED.gamma_multiply(0.2), "Older reports fade"),
    ],
    OverlayKind::Weather => vec![LegendSwatch::new(
      Color32::from_rgb(255, 255, 255),
      "Current conditions panel",
    )],
    OverlayKind::Traffic => [
      CongestionLevel::Heavy,
      CongestionLevel::Medium,
      CongestionLevel::Light,
    ]
    .into_iter()
    .map(|level| {
      let mut label = level.name().to_string();
      label[..1].make_ascii_uppercase();
      LegendSwatch::new(level.color(), label)
    })
    .collect(),
  }
}

/// One legend key per active overlay, in a stable order.
#[must_use]
pub fn legend_entries(active: &BTreeSet<OverlayKind>) -> Vec<LegendEntry> {
  active
    .iter()
    .map(|overlay| LegendEntry {
      overlay: *overlay,
      swatches: swatches(*overlay),
    })
    .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerControlAction {
  SetBase(BaseLayer),
  ToggleOverlay(OverlayKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
  pub label: &'static str,
  pub active: bool,
  pub action: LayerControlAction,
}

/// The six base layers followed by the six overlays.
#[must_use]
pub fn menu_items(base: BaseLayer, active: &BTreeSet<OverlayKind>) -> Vec<MenuItem> {
  BaseLayer::ALL
    .iter()
    .map(|layer| MenuItem {
      label: layer.name(),
      active: *layer == base,
      action: LayerControlAction::SetBase(*layer),
    })
    .chain(OverlayKind::ALL.iter().map(|overlay| MenuItem {
      label: overlay.name(),
      active: active.contains(overlay),
      action: LayerControlAction::ToggleOverlay(*overlay),
    }))
    .collect()
}

fn swatch(ui: &mut egui::Ui, color: Color32) {
  let (rect, _) = ui.allocate_exact_size(egui::vec2(14., 14.), egui::Sense::hover());
  ui.painter().rect(
    rect,
    egui::CornerRadius::same(2),
    color,
    egui::Stroke::new(1., Color32::from_gray(120)),
    egui::StrokeKind::Inside,
  );
}

/// Legend and layer menu. The only state is whether the menu is expanded.
#[derive(Debug, Default)]
pub struct LayerControl {
  open: bool,
}

impl LayerControl {
  #[must_use]
  pub fn is_open(&self) -> bool {
    self.open
  }

  pub fn toggle(&mut self) {
    self.open = !self.open;
  }

  pub fn ui(
    &mut self,
    ui: &mut egui::Ui,
    base: BaseLayer,
    active: &BTreeSet<OverlayKind>,
  ) -> Option<LayerControlAction> {
    let mut action = None;
    ui.horizontal(|ui| {
      ui.heading("Layers");
      ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
        let label = if self.open { "Hide" } else { "Show" };
        if ui.small_button(label).clicked() {
          self.toggle();
        }
      });
    });
    if self.open {
      let items = menu_items(base, active);
      ui.strong("Base map");
      for item in items.iter().take(BaseLayer::ALL.len()) {
        if ui.radio(item.active, item.label).clicked() {
          action = Some(item.action);
        }
      }
      ui.separator();
      ui.strong("Overlays");
      for item in items.iter().skip(BaseLayer::ALL.len()) {
        let mut checked = item.active;
        if ui.checkbox(&mut checked, item.label).clicked() {
          action = Some(item.action);
        }
      }
    }
    let entries = legend_entries(active);
    if !entries.is_empty() {
      ui.separator();
      ui.strong("Legend");
      for entry in entries {
        ui.label(egui::RichText::new(entry.overlay.name()).small().strong());
        for s in &entry.swatches {
          ui.horizontal(|ui| {
            swatch(ui, s.color);
            ui.small(&s.label);
          });
        }
      }
    }
    action
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn legend_follows_active_overlays() {
    assert!(legend_entries(&BTreeSet::new()).is_empty());
    let active = BTreeSet::from([OverlayKind::Traffic, OverlayKind::Boundaries]);
    let entries = legend_entries(&active);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].overlay, OverlayKind::Boundaries);
    assert_eq!(entries[1].overlay, OverlayKind::Traffic);
    assert_eq!(entries[1].swatches[0].label, "Heavy");
  }

  #[test]
  fn population_legend_has_six_buckets() {
    let entries = legend_entries(&BTreeSet::from([OverlayKind::Population]));
    assert_eq!(entries[0].swatches.len(), 6);
    assert_eq!(entries[0].swatches[5].color, LOW_DENSITY);
  }

  #[test]
  fn menu_marks_active_layers() {
    let active = BTreeSet::from([OverlayKind::Weather]);
    let items = menu_items(BaseLayer::Dark, &active);
    assert_eq!(items.len(), 12);
    let on: Vec<&str> = items.iter().filter(|i| i.active).map(|i| i.label).collect();
    assert_eq!(on, [BaseLayer::Dark.name(), OverlayKind::Weather.name()]);
  }
}
