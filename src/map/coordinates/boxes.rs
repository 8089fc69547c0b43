use serde::{Deserialize, Serialize};

use super::{Coordinate, PixelCoordinate, TILE_SIZE, WGS84Coordinate};

/// A tile in the Web Mercator projection.
#[derive(Debug, PartialEq, Copy, Clone, Hash, Eq, Serialize, Deserialize)]
pub struct Tile {
  pub x: u32,
  pub y: u32,
  pub zoom: u8,
}

impl Tile {
  /// Checks existence of the tile.
  #[must_use]
  pub fn exists(&self) -> bool {
    let max_tile = 2u32.pow(self.zoom.into()) - 1;
    self.x <= max_tile && self.y <= max_tile
  }

  /// The parent one zoom level lower.
  #[must_use]
  pub fn parent(&self) -> Option<Self> {
    match self.zoom {
      0 => None,
      _ => Some(Self {
        x: self.x >> 1,
        y: self.y >> 1,
        zoom: self.zoom - 1,
      }),
    }
  }

  /// The tile containing `coord` at `zoom`.
  #[must_use]
  #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
  pub fn containing(coord: PixelCoordinate, zoom: u8) -> Self {
    let n = f64::from(2u32.pow(zoom.into()));
    let max = n - 1.;
    Self {
      x: (coord.x / TILE_SIZE * n).floor().clamp(0., max) as u32,
      y: (coord.y / TILE_SIZE * n).floor().clamp(0., max) as u32,
      zoom,
    }
  }

  /// North-west and south-east corner of the tile.
  #[must_use]
  pub fn position(&self) -> (PixelCoordinate, PixelCoordinate) {
    let size = TILE_SIZE / f64::from(2u32.pow(self.zoom.into()));
    let nw = PixelCoordinate::new(f64::from(self.x) * size, f64::from(self.y) * size);
    (nw, PixelCoordinate::new(nw.x + size, nw.y + size))
  }
}

/// All tiles at `zoom` covering the box spanned by `nw` and `se`.
pub fn tiles_in_box(
  nw: PixelCoordinate,
  se: PixelCoordinate,
  zoom: u8,
) -> impl Iterator<Item = Tile> {
  let nw_tile = Tile::containing(nw, zoom);
  let se_tile = Tile::containing(se, zoom);
  (nw_tile.x..=se_tile.x)
    .flat_map(move |x| (nw_tile.y..=se_tile.y).map(move |y| Tile { x, y, zoom }))
    .filter(Tile::exists)
}

/// An axis aligned box in ``PixelCoordinate`` space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
  max_x: f64,
  min_x: f64,
  max_y: f64,
  min_y: f64,
}

impl Default for BoundingBox {
  fn default() -> Self {
    Self::new()
  }
}

impl BoundingBox {
  #[must_use]
  pub fn new() -> Self {
    Self::get_invalid()
  }

  #[must_use]
  pub fn get_invalid() -> Self {
    Self {
      max_x: f64::MIN,
      min_x: f64::MAX,
      max_y: f64::MIN,
      min_y: f64::MAX,
    }
  }

  #[must_use]
  pub fn from_corners(a: PixelCoordinate, b: PixelCoordinate) -> Self {
    Self::from_iterator([a, b])
  }

  #[must_use]
  pub fn center(&self) -> PixelCoordinate {
    PixelCoordinate {
      x: f64::midpoint(self.max_x, self.min_x),
      y: f64::midpoint(self.max_y, self.min_y),
    }
  }

  pub fn from_iterator<C: Coordinate, I: IntoIterator<Item = C>>(positions: I) -> Self {
    let mut bb = Self::get_invalid();
    positions
      .into_iter()
      .for_each(|pos| bb.add_coordinate(pos.as_pixel_coordinate()));
    bb
  }

  #[must_use]
  pub fn is_valid(&self) -> bool {
    self.min_y <= self.max_y && self.min_x <= self.max_x
  }

  /// Valid and collapsed to a single position.
  #[must_use]
  pub fn is_point(&self) -> bool {
    self.is_valid() && self.width() <= 0. && self.height() <= 0.
  }

  pub fn frame(&mut self, frame: f64) {
    self.min_x -= frame;
    self.min_y -= frame;
    self.max_x += frame;
    self.max_y += frame;
  }

  pub fn add_coordinate(&mut self, pp: PixelCoordinate) {
    self.min_y = self.min_y.min(pp.y);
    self.min_x = self.min_x.min(pp.x);
    self.max_y = self.max_y.max(pp.y);
    self.max_x = self.max_x.max(pp.x);
  }

  #[must_use]
  pub fn extend(self, bb: &Self) -> Self {
    if !self.is_valid() {
      return *bb;
    }

    if !bb.is_valid() {
      return self;
    }

    Self {
      min_x: self.min_x.min(bb.min_x),
      min_y: self.min_y.min(bb.min_y),
      max_x: self.max_x.max(bb.max_x),
      max_y: self.max_y.max(bb.max_y),
    }
  }

  #[must_use]
  pub fn contains(&self, pp: PixelCoordinate) -> bool {
    (self.min_x..=self.max_x).contains(&pp.x) && (self.min_y..=self.max_y).contains(&pp.y)
  }

  #[must_use]
  pub fn width(&self) -> f64 {
    self.max_x - self.min_x
  }

  #[must_use]
  pub fn height(&self) -> f64 {
    self.max_y - self.min_y
  }

  #[must_use]
  pub fn north_west(&self) -> PixelCoordinate {
    PixelCoordinate::new(self.min_x, self.min_y)
  }

  #[must_use]
  pub fn south_east(&self) -> PixelCoordinate {
    PixelCoordinate::new(self.max_x, self.max_y)
  }

  /// The geographic center of the box.
  #[must_use]
  pub fn center_wgs84(&self) -> WGS84Coordinate {
    self.center().as_wgs84()
  }
}
