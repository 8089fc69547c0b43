mod boxes;
mod coords;

/// Tiles and bounding boxes.
pub use boxes::*;
/// Coordinates.
pub use coords::*;

/// A trait generalizing types of coordinates used in this application.
pub trait Coordinate: Copy + Clone + std::fmt::Debug {
  fn as_wgs84(&self) -> WGS84Coordinate;
  fn as_pixel_coordinate(&self) -> PixelCoordinate;
}

impl Coordinate for WGS84Coordinate {
  fn as_wgs84(&self) -> WGS84Coordinate {
    *self
  }

  fn as_pixel_coordinate(&self) -> PixelCoordinate {
    PixelCoordinate::from(*self)
  }
}
