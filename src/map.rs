/// Camera moves: fly-to targets and the recenter rule for selections.
pub mod camera;
/// Marker clustering and spiderfying.
pub mod cluster;
/// Contains everything needed to handle coordinates.
pub mod coordinates;
/// Painting of map items and overlay features.
pub mod drawable;
/// Complaint density raster.
pub mod heat;
/// Marker glyphs and the status palette.
pub mod icons;
/// Base and overlay layers.
pub mod layers;
/// The registry of everything mounted on the map.
pub mod surface;
/// Map tile functionality.
mod tile_loader;
/// Center, zoom and projection.
pub mod viewport;
