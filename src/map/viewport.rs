use super::coordinates::{BoundingBox, Coordinate, PixelCoordinate, PixelPosition, WGS84Coordinate};

pub const MIN_ZOOM: f64 = 2.;
pub const MAX_ZOOM: f64 = 20.;

/// The camera looking at the map: a geographic center, a fractional zoom level and the size of
/// the drawing area in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
  pub center: WGS84Coordinate,
  pub zoom: f64,
  pub size: [f32; 2],
}

impl Viewport {
  #[must_use]
  pub fn new(center: WGS84Coordinate, zoom: f64, size: [f32; 2]) -> Self {
    Self {
      center,
      zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
      size,
    }
  }

  #[must_use]
  pub fn scale(&self) -> f64 {
    self.zoom.exp2()
  }

  fn half_size(&self) -> (f64, f64) {
    (f64::from(self.size[0]) / 2., f64::from(self.size[1]) / 2.)
  }

  /// Screen position relative to the top-left corner of the drawing area.
  #[must_use]
  #[allow(clippy::cast_possible_truncation)]
  pub fn project<C: Coordinate>(&self, coord: C) -> PixelPosition {
    let p = coord.as_pixel_coordinate();
    let c = self.center.as_pixel_coordinate();
    let (hw, hh) = self.half_size();
    PixelPosition {
      x: ((p.x - c.x) * self.scale() + hw) as f32,
      y: ((p.y - c.y) * self.scale() + hh) as f32,
    }
  }

  #[must_use]
  pub fn unproject_pixel(&self, pos: PixelPosition) -> PixelCoordinate {
    let c = self.center.as_pixel_coordinate();
    let (hw, hh) = self.half_size();
    PixelCoordinate {
      x: c.x + (f64::from(pos.x) - hw) / self.scale(),
      y: c.y + (f64::from(pos.y) - hh) / self.scale(),
    }
  }

  #[must_use]
  pub fn unproject(&self, pos: PixelPosition) -> WGS84Coordinate {
    self.unproject_pixel(pos).as_wgs84()
  }

  /// The visible area in ``PixelCoordinate`` space.
  #[must_use]
  pub fn world_bounds(&self) -> BoundingBox {
    BoundingBox::from_corners(
      self.unproject_pixel(PixelPosition::new(0., 0.)),
      self.unproject_pixel(PixelPosition::new(self.size[0], self.size[1])),
    )
  }

  /// Moves the map by a screen delta, e.g. from a drag gesture.
  pub fn pan_by(&mut self, dx: f32, dy: f32) {
    let c = self.center.as_pixel_coordinate();
    let shifted = PixelCoordinate {
      x: c.x - f64::from(dx) / self.scale(),
      y: c.y - f64::from(dy) / self.scale(),
    };
    self.center = shifted.as_wgs84();
  }

  /// Zooms by `delta` levels keeping the coordinate under `anchor` in place.
  pub fn zoom_around(&mut self, delta: f64, anchor: PixelPosition) {
    let before = self.unproject_pixel(anchor);
    self.zoom = (self.zoom + delta).clamp(MIN_ZOOM, MAX_ZOOM);
    let after = self.unproject_pixel(anchor);
    let c = self.center.as_pixel_coordinate();
    self.center = (c + (before - after)).as_wgs84();
  }

  /// The largest zoom at which `bb` fits into the viewport with some padding. An axis without
  /// extent does not constrain the zoom.
  #[must_use]
  pub fn zoom_to_fit(&self, bb: &BoundingBox, max_zoom: f64) -> f64 {
    if !bb.is_valid() || bb.is_point() {
      return max_zoom;
    }
    let padding = 0.9;
    let fit = |screen: f32, extent: f64| {
      if extent > 0. {
        (f64::from(screen) * padding / extent).log2()
      } else {
        f64::INFINITY
      }
    };
    let zx = fit(self.size[0], bb.width());
    let zy = fit(self.size[1], bb.height());
    zx.min(zy).floor().clamp(MIN_ZOOM, max_zoom)
  }
}
