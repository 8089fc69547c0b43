use std::{collections::HashMap, sync::Arc};

use egui::{Color32, ColorImage};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{
  coordinates::{PixelPosition, WGS84Coordinate},
  viewport::Viewport,
};
use crate::records::MapRecord;

/// A weighted sample for the density layer. Intensity lies in `(0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatPoint {
  pub position: WGS84Coordinate,
  pub intensity: f64,
}

/// Complaints weighted by severity. Projects carry no heat.
#[must_use]
pub fn heat_points(records: &[MapRecord]) -> Vec<HeatPoint> {
  records
    .iter()
    .filter_map(|r| {
      r.heat_intensity().map(|intensity| HeatPoint {
        position: r.position,
        intensity,
      })
    })
    .collect()
}

fn default_gradient() -> Vec<(f32, Color32)> {
  vec![
    (0.4, Color32::from_rgb(0, 0, 255)),
    (0.6, Color32::from_rgb(0, 255, 255)),
    (0.7, Color32::from_rgb(0, 255, 0)),
    (0.8, Color32::from_rgb(255, 255, 0)),
    (1.0, Color32::from_rgb(255, 0, 0)),
  ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatOptions {
  /// Radius of a single point in screen pixels.
  pub radius: f32,
  /// Width of the soft edge around each point.
  pub blur: f32,
  /// Zoom at which points reach full intensity.
  pub max_zoom: f64,
  pub min_opacity: f32,
  /// Color stops over normalized density, ascending.
  pub gradient: Vec<(f32, Color32)>,
}

impl Default for HeatOptions {
  fn default() -> Self {
    Self {
      radius: 25.,
      blur: 15.,
      max_zoom: 17.,
      min_opacity: 0.05,
      gradient: default_gradient(),
    }
  }
}

impl HeatOptions {
  fn extent(&self) -> f32 {
    self.radius.max(1.) + self.blur.max(0.)
  }

  /// 256 entry lookup from density to color.
  #[allow(clippy::cast_precision_loss)]
  fn palette(&self) -> [Color32; 256] {
    let mut palette = [Color32::TRANSPARENT; 256];
    let stops = if self.gradient.is_empty() {
      default_gradient()
    } else {
      self.gradient.clone()
    };
    for (i, entry) in palette.iter_mut().enumerate() {
      let t = i as f32 / 255.;
      *entry = gradient_at(&stops, t);
    }
    palette
  }

  /// Falloff of one point at screen distance `d`.
  fn kernel(&self, d: f32) -> f32 {
    let inner = (self.radius - self.blur).max(0.);
    let outer = self.extent();
    if d <= inner {
      1.
    } else if d >= outer {
      0.
    } else {
      let t = (d - inner) / (outer - inner);
      (1. - t * t) * (1. - t * t)
    }
  }
}

fn gradient_at(stops: &[(f32, Color32)], t: f32) -> Color32 {
  let Some(&(first_at, first)) = stops.first() else {
    return Color32::TRANSPARENT;
  };
  if t <= first_at {
    return first;
  }
  for pair in stops.windows(2) {
    let (a_at, a) = pair[0];
    let (b_at, b) = pair[1];
    if t <= b_at {
      let f = if b_at > a_at { (t - a_at) / (b_at - a_at) } else { 1. };
      return a.lerp_to_gamma(b, f);
    }
  }
  stops.last().map_or(first, |&(_, c)| c)
}

/// A rendered density raster covering the viewport.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatSurface {
  pub size: [usize; 2],
  pub pixels: Vec<Color32>,
}

impl HeatSurface {
  #[must_use]
  pub fn is_blank(&self) -> bool {
    self.pixels.iter().all(|p| p.a() == 0)
  }

  #[must_use]
  pub fn pixel(&self, x: usize, y: usize) -> Option<Color32> {
    (x < self.size[0] && y < self.size[1]).then(|| self.pixels[y * self.size[0] + x])
  }

  #[must_use]
  pub fn to_color_image(&self) -> ColorImage {
    let bytes: Vec<u8> = self.pixels.iter().flat_map(|c| c.to_array()).collect();
    ColorImage::from_rgba_premultiplied(self.size, &bytes)
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SurfaceKey {
  center: WGS84Coordinate,
  zoom: f64,
  size: [f32; 2],
}

impl From<&Viewport> for SurfaceKey {
  fn from(v: &Viewport) -> Self {
    Self {
      center: v.center,
      zoom: v.zoom,
      size: v.size,
    }
  }
}

/// Density layer over a shared point set. The raster is cached per viewport and discarded
/// whenever the point set is replaced.
pub struct HeatLayer {
  options: HeatOptions,
  palette: [Color32; 256],
  points: Arc<[HeatPoint]>,
  cached: Option<(SurfaceKey, Arc<HeatSurface>)>,
  rebuilds: usize,
}

impl HeatLayer {
  #[must_use]
  pub fn new(options: HeatOptions) -> Self {
    Self {
      palette: options.palette(),
      options,
      points: Arc::from(Vec::new()),
      cached: None,
      rebuilds: 0,
    }
  }

  #[must_use]
  pub fn options(&self) -> &HeatOptions {
    &self.options
  }

  #[must_use]
  pub fn points(&self) -> &Arc<[HeatPoint]> {
    &self.points
  }

  /// Replaces the point set. A different set tears down the previous raster.
  pub fn set_points(&mut self, points: Arc<[HeatPoint]>) {
    if !Arc::ptr_eq(&self.points, &points) {
      self.teardown();
      self.points = points;
    }
  }

  pub fn teardown(&mut self) {
    if self.cached.take().is_some() {
      log::debug!("Heat raster discarded");
    }
  }

  /// Whether a raster is currently held.
  #[must_use]
  pub fn has_raster(&self) -> bool {
    self.cached.is_some()
  }

  /// Number of times a raster was computed.
  #[must_use]
  pub fn rebuild_count(&self) -> usize {
    self.rebuilds
  }

  pub fn render(&mut self, viewport: &Viewport) -> Arc<HeatSurface> {
    let key = SurfaceKey::from(viewport);
    if let Some((cached_key, surface)) = &self.cached
      && *cached_key == key
    {
      return surface.clone();
    }
    let start = std::time::Instant::now();
    let surface = Arc::new(rasterize(
      &self.points,
      viewport,
      &self.options,
      &self.palette,
    ));
    self.rebuilds += 1;
    log::debug!(
      "Heat raster for {} points rendered in {:?}",
      self.points.len(),
      start.elapsed()
    );
    self.cached = Some((key, surface.clone()));
    surface
  }
}

#[allow(
  clippy::cast_possible_truncation,
  clippy::cast_sign_loss,
  clippy::cast_precision_loss
)]
fn rasterize(
  points: &[HeatPoint],
  viewport: &Viewport,
  options: &HeatOptions,
  palette: &[Color32; 256],
) -> HeatSurface {
  let width = viewport.size[0].max(0.).ceil() as usize;
  let height = viewport.size[1].max(0.).ceil() as usize;
  let size = [width, height];
  if width == 0 || height == 0 || points.is_empty() {
    return HeatSurface {
      size,
      pixels: vec![Color32::TRANSPARENT; width * height],
    };
  }

  let extent = options.extent();
  let cell = (extent / 2.).max(1.);
  let zoom_gap = (options.max_zoom - viewport.zoom).clamp(0., 12.);
  let weight = (1. / zoom_gap.exp2()) as f32;

  // Bucket points into a coarse screen grid, accumulating weight at the weighted centroid.
  let mut grid: HashMap<(i32, i32), (f32, f32, f32)> = HashMap::new();
  for p in points {
    let pos = viewport.project(p.position);
    if pos.x < -extent
      || pos.y < -extent
      || pos.x > viewport.size[0] + extent
      || pos.y > viewport.size[1] + extent
    {
      continue;
    }
    let k = p.intensity.clamp(0., 1.) as f32 * weight;
    let entry = grid
      .entry(((pos.x / cell).floor() as i32, (pos.y / cell).floor() as i32))
      .or_insert((0., 0., 0.));
    entry.0 += pos.x * k;
    entry.1 += pos.y * k;
    entry.2 += k;
  }

  let mut alpha = vec![0f32; width * height];
  let reach = extent.ceil() as i64;
  for (sx, sy, k) in grid.into_values() {
    if k <= 0. {
      continue;
    }
    let center = PixelPosition::new(sx / k, sy / k);
    let strength = k.min(1.).max(options.min_opacity);
    let cx = center.x.round() as i64;
    let cy = center.y.round() as i64;
    for y in (cy - reach).max(0)..=(cy + reach).min(height as i64 - 1) {
      for x in (cx - reach).max(0)..=(cx + reach).min(width as i64 - 1) {
        let d = center.distance(&PixelPosition::new(x as f32, y as f32));
        let a = options.kernel(d) * strength;
        if a > 0. {
          let dst = &mut alpha[y as usize * width + x as usize];
          *dst += a * (1. - *dst);
        }
      }
    }
  }

  let pixels = alpha
    .par_iter()
    .map(|&a| {
      if a <= 0. {
        return Color32::TRANSPARENT;
      }
      let index = (a.clamp(0., 1.) * 255.).round() as usize;
      let [r, g, b, _] = palette[index].to_array();
      Color32::from_rgba_unmultiplied(r, g, b, index as u8)
    })
    .collect();

  HeatSurface { size, pixels }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::records::RecordKind;

  fn record(id: i64, kind: RecordKind) -> MapRecord {
    MapRecord {
      id,
      kind,
      title: String::new(),
      description: String::new(),
      position: WGS84Coordinate::new(19.07, 72.90),
      status: "pending".to_string(),
      photo_urls: vec![],
      created_at: None,
    }
  }

  fn viewport() -> Viewport {
    Viewport::new(WGS84Coordinate::new(19.07, 72.90), 14., [200., 200.])
  }

  #[test]
  fn only_complaints_contribute() {
    let points = heat_points(&[
      record(1, RecordKind::Complaint { severity: 5 }),
      record(2, RecordKind::Project { budget: None }),
      record(3, RecordKind::Complaint { severity: 1 }),
    ]);
    assert_eq!(points.len(), 2);
    assert!((points[0].intensity - 1.).abs() < 1e-9);
    assert!((points[1].intensity - 0.2).abs() < 1e-9);
  }

  #[test]
  fn surface_is_hot_at_point_and_cold_far_away() {
    let mut layer = HeatLayer::new(HeatOptions::default());
    layer.set_points(Arc::from(heat_points(&[record(
      1,
      RecordKind::Complaint { severity: 5 },
    )])));
    let surface = layer.render(&viewport());
    assert_eq!(surface.size, [200, 200]);
    assert!(surface.pixel(100, 100).is_some_and(|c| c.a() > 0));
    assert_eq!(surface.pixel(0, 0), Some(Color32::TRANSPARENT));
  }

  #[test]
  fn replacing_points_discards_raster() {
    let mut layer = HeatLayer::new(HeatOptions::default());
    let points: Arc<[HeatPoint]> = Arc::from(heat_points(&[record(
      1,
      RecordKind::Complaint { severity: 3 },
    )]));
    layer.set_points(points.clone());
    let vp = viewport();
    let _ = layer.render(&vp);
    let _ = layer.render(&vp);
    assert_eq!(layer.rebuild_count(), 1);

    layer.set_points(points);
    let _ = layer.render(&vp);
    assert_eq!(layer.rebuild_count(), 1);

    layer.set_points(Arc::from(Vec::new()));
    let surface = layer.render(&vp);
    assert_eq!(layer.rebuild_count(), 2);
    assert!(surface.is_blank());
  }

  #[test]
  fn palette_follows_gradient() {
    let palette = HeatOptions::default().palette();
    assert_eq!(palette[0], Color32::from_rgb(0, 0, 255));
    assert_eq!(palette[255], Color32::from_rgb(255, 0, 0));
  }
}
