use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

use super::Coordinate;

/// Edge length of a tile in world pixels. A ``PixelCoordinate`` spans one tile at zoom 0.
pub const TILE_SIZE: f64 = 256.;

/// Latitude bound of the web mercator projection.
pub const MAX_LATITUDE: f64 = 85.051_128_78;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two coordinates in meters.
#[must_use]
pub fn distance_in_meters(coord1: WGS84Coordinate, coord2: WGS84Coordinate) -> f64 {
  let d_lat = (coord2.lat - coord1.lat).to_radians();
  let d_lon = (coord2.lon - coord1.lon).to_radians();
  let a = (d_lat / 2.0).sin() * (d_lat / 2.0).sin()
    + coord1.lat.to_radians().cos()
      * coord2.lat.to_radians().cos()
      * (d_lon / 2.0).sin()
      * (d_lon / 2.0).sin();
  let c = 2.0 * f64::atan2(a.sqrt(), (1.0 - a).sqrt());
  EARTH_RADIUS_M * c
}

/// Meters covered by one screen pixel at the given latitude and zoom.
#[must_use]
pub fn meters_per_pixel(lat: f64, zoom: f64) -> f64 {
  2. * std::f64::consts::PI * EARTH_RADIUS_M * lat.to_radians().cos() / (TILE_SIZE * zoom.exp2())
}

/// The standard WGS84 coordinate system.
#[derive(Debug, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct WGS84Coordinate {
  #[serde(alias = "latitude")]
  pub lat: f64,
  #[serde(alias = "longitude", alias = "lng")]
  pub lon: f64,
}

impl WGS84Coordinate {
  #[must_use]
  pub fn new(lat: f64, lon: f64) -> Self {
    Self { lat, lon }
  }

  /// Finite and inside the valid lat/lon ranges.
  #[must_use]
  pub fn is_valid(&self) -> bool {
    self.lat.is_finite()
      && self.lon.is_finite()
      && (-90.0..=90.0).contains(&self.lat)
      && (-180.0..=180.0).contains(&self.lon)
  }

  /// Linear interpolation, used by camera animations.
  #[must_use]
  pub fn lerp(self, other: Self, t: f64) -> Self {
    Self {
      lat: self.lat + (other.lat - self.lat) * t,
      lon: self.lon + (other.lon - self.lon) * t,
    }
  }
}

/// Web mercator position on an imaginary canvas of one tile at zoom 0.
/// Multiply by `2^zoom` to get the world pixel at that zoom.
#[derive(Debug, Default, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct PixelCoordinate {
  pub x: f64,
  pub y: f64,
}

impl PixelCoordinate {
  #[must_use]
  pub fn new(x: f64, y: f64) -> Self {
    Self { x, y }
  }

  #[must_use]
  pub fn sq_dist(&self, p: &Self) -> f64 {
    let dx = p.x - self.x;
    let dy = p.y - self.y;
    dx * dx + dy * dy
  }

  /// World pixel at the given zoom level.
  #[must_use]
  pub fn at_zoom(self, zoom: f64) -> [f64; 2] {
    let scale = zoom.exp2();
    [self.x * scale, self.y * scale]
  }

  #[must_use]
  pub fn from_zoomed(p: [f64; 2], zoom: f64) -> Self {
    let scale = zoom.exp2();
    Self {
      x: p[0] / scale,
      y: p[1] / scale,
    }
  }
}

impl Coordinate for PixelCoordinate {
  fn as_wgs84(&self) -> WGS84Coordinate {
    WGS84Coordinate::from(*self)
  }

  fn as_pixel_coordinate(&self) -> PixelCoordinate {
    *self
  }
}

impl From<WGS84Coordinate> for PixelCoordinate {
  fn from(coord: WGS84Coordinate) -> Self {
    let lat = coord.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (coord.lon + 180.) / 360. * TILE_SIZE;
    let y = (1. - (lat.tan() + 1. / lat.cos()).ln() / std::f64::consts::PI) / 2. * TILE_SIZE;
    Self { x, y }
  }
}

impl From<PixelCoordinate> for WGS84Coordinate {
  fn from(pp: PixelCoordinate) -> Self {
    let n = std::f64::consts::PI - 2. * std::f64::consts::PI * pp.y / TILE_SIZE;
    WGS84Coordinate {
      lat: n.sinh().atan().to_degrees(),
      lon: pp.x / TILE_SIZE * 360. - 180.,
    }
  }
}

impl Add for PixelCoordinate {
  type Output = Self;

  fn add(self, rhs: Self) -> Self {
    Self {
      x: self.x + rhs.x,
      y: self.y + rhs.y,
    }
  }
}

impl Sub for PixelCoordinate {
  type Output = Self;

  fn sub(self, rhs: Self) -> Self {
    Self {
      x: self.x - rhs.x,
      y: self.y - rhs.y,
    }
  }
}

impl Mul<f64> for PixelCoordinate {
  type Output = Self;

  fn mul(self, rhs: f64) -> Self {
    Self {
      x: self.x * rhs,
      y: self.y * rhs,
    }
  }
}

/// Meant for actual pixel in the UI. Handled equivalently to a ``egui::Pos2``.
#[derive(Debug, Default, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct PixelPosition {
  pub x: f32,
  pub y: f32,
}

impl PixelPosition {
  #[must_use]
  pub fn new(x: f32, y: f32) -> Self {
    Self { x, y }
  }

  #[must_use]
  pub fn distance(&self, other: &Self) -> f32 {
    ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
  }
}

impl From<egui::Pos2> for PixelPosition {
  fn from(pos: egui::Pos2) -> Self {
    PixelPosition { x: pos.x, y: pos.y }
  }
}

impl From<PixelPosition> for egui::Pos2 {
  fn from(pp: PixelPosition) -> Self {
    egui::Pos2::new(pp.x, pp.y)
  }
}

impl Add for PixelPosition {
  type Output = Self;

  fn add(self, rhs: PixelPosition) -> Self {
    Self {
      x: self.x + rhs.x,
      y: self.y + rhs.y,
    }
  }
}

impl Mul<f32> for PixelPosition {
  type Output = Self;

  fn mul(self, rhs: f32) -> Self {
    Self {
      x: self.x * rhs,
      y: self.y * rhs,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use assert_approx_eq::assert_approx_eq;

  #[test]
  fn coordinate_to_pixel_zero() {
    let pp = PixelCoordinate::from(WGS84Coordinate::new(0., 0.));
    assert_approx_eq!(pp.x, 128.);
    assert_approx_eq!(pp.y, 128.);
  }

  #[test]
  fn projection_round_trip_mumbai() {
    let mumbai = WGS84Coordinate::new(19.076, 72.8777);
    let back = WGS84Coordinate::from(PixelCoordinate::from(mumbai));
    assert_approx_eq!(back.lat, mumbai.lat, 1e-9);
    assert_approx_eq!(back.lon, mumbai.lon, 1e-9);
  }

  #[test]
  fn distance() {
    let coord1 = WGS84Coordinate::new(0.0, 0.0);
    let coord2 = WGS84Coordinate::new(0.0, 1.0);
    assert_approx_eq!(distance_in_meters(coord1, coord2), 111_195.08, 0.2);

    let alexanderplatz = WGS84Coordinate::new(52.520_754, 13.409_496);
    let hamburg_hbf = WGS84Coordinate::new(53.552_7, 10.006_6);
    assert_approx_eq!(
      distance_in_meters(alexanderplatz, hamburg_hbf),
      254_785.,
      1.
    );
  }

  #[test]
  fn invalid_coordinates() {
    assert!(!WGS84Coordinate::new(f64::NAN, 72.9).is_valid());
    assert!(!WGS84Coordinate::new(19.0, f64::INFINITY).is_valid());
    assert!(!WGS84Coordinate::new(91.0, 0.0).is_valid());
    assert!(WGS84Coordinate::new(19.07, 72.90).is_valid());
  }
}
