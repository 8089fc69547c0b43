use std::collections::BTreeMap;

use super::layers::{BaseLayer, OverlayFeature, OverlayKind};

/// Registration slot on the map surface. The ordering is the drawing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LayerKey {
  Base,
  Overlay(OverlayKind),
  Heat,
  Markers,
}

/// What a lessee registered under its key.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerContent {
  Tiles(BaseLayer),
  Features(Vec<OverlayFeature>),
  /// The density raster, rendered per frame by the heat layer.
  Heat,
  /// Markers and clusters, partitioned per frame by the cluster layer.
  Markers,
}

impl LayerContent {
  #[must_use]
  pub fn feature_count(&self) -> usize {
    match self {
      LayerContent::Features(features) => features.len(),
      _ => 0,
    }
  }
}

/// The single drawing surface of a map view. Layers lease a slot through `add` and give it back
/// through `remove`; there is no other way to change what is drawn.
#[derive(Debug, Default)]
pub struct MapSurface {
  layers: BTreeMap<LayerKey, LayerContent>,
  adds: usize,
  removes: usize,
}

impl MapSurface {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  /// Mounts `content` under `key`, unmounting whatever held the slot before.
  pub fn add(&mut self, key: LayerKey, content: LayerContent) {
    self.remove(key);
    log::debug!(
      "Mounting layer {key:?} with {} features",
      content.feature_count()
    );
    self.layers.insert(key, content);
    self.adds += 1;
  }

  /// Unmounts `key`. Removing an absent layer is a no-op.
  pub fn remove(&mut self, key: LayerKey) -> bool {
    if self.layers.remove(&key).is_some() {
      log::debug!("Unmounting layer {key:?}");
      self.removes += 1;
      true
    } else {
      false
    }
  }

  #[must_use]
  pub fn get(&self, key: LayerKey) -> Option<&LayerContent> {
    self.layers.get(&key)
  }

  #[must_use]
  pub fn contains(&self, key: LayerKey) -> bool {
    self.layers.contains_key(&key)
  }

  /// Mounted layers bottom to top.
  pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&LayerKey, &LayerContent)> {
    self.layers.iter()
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.layers.len()
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.layers.is_empty()
  }

  #[must_use]
  pub fn base_layer(&self) -> Option<BaseLayer> {
    match self.layers.get(&LayerKey::Base)? {
      LayerContent::Tiles(base) => Some(*base),
      _ => None,
    }
  }

  #[must_use]
  pub fn feature_count(&self, key: LayerKey) -> usize {
    self.layers.get(&key).map_or(0, LayerContent::feature_count)
  }

  /// Total features across all overlays.
  #[must_use]
  pub fn total_feature_count(&self) -> usize {
    self.layers.values().map(LayerContent::feature_count).sum()
  }

  /// Every mount is matched by an unmount except for the layers still mounted.
  #[must_use]
  pub fn is_balanced(&self) -> bool {
    self.adds == self.removes + self.layers.len()
  }

  #[must_use]
  pub fn mount_count(&self) -> usize {
    self.adds
  }

  /// Unmounts everything, e.g. when the view goes away.
  pub fn clear(&mut self) {
    let keys: Vec<_> = self.layers.keys().copied().collect();
    for key in keys {
      self.remove(key);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::map::{coordinates::WGS84Coordinate, layers::FeatureStyle};
  use egui::Color32;

  fn features(n: usize) -> LayerContent {
    LayerContent::Features(
      (0..n)
        .map(|_| OverlayFeature::Circle {
          center: WGS84Coordinate::new(19., 72.),
          radius_m: 10.,
          style: FeatureStyle::outline(Color32::RED, 1.),
        })
        .collect(),
    )
  }

  #[test]
  fn re_adding_replaces() {
    let mut surface = MapSurface::new();
    let key = LayerKey::Overlay(OverlayKind::Historical);
    surface.add(key, features(3));
    surface.add(key, features(3));
    assert_eq!(surface.feature_count(key), 3);
    assert!(surface.is_balanced());
    assert!(!surface.remove(LayerKey::Heat));
  }

  #[test]
  fn layers_iterate_in_z_order() {
    let mut surface = MapSurface::new();
    surface.add(LayerKey::Markers, LayerContent::Markers);
    surface.add(LayerKey::Overlay(OverlayKind::Traffic), features(1));
    surface.add(LayerKey::Base, LayerContent::Tiles(BaseLayer::Dark));
    let keys: Vec<_> = surface.iter().map(|(k, _)| *k).collect();
    assert_eq!(
      keys,
      vec![
        LayerKey::Base,
        LayerKey::Overlay(OverlayKind::Traffic),
        LayerKey::Markers
      ]
    );
    surface.clear();
    assert!(surface.is_empty());
    assert!(surface.is_balanced());
  }
}
