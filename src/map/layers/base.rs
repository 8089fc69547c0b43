use serde::{Deserialize, Serialize};

/// The background tile layers a user can switch between. Exactly one is mounted at a time.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum BaseLayer {
  #[default]
  Street,
  Satellite,
  Terrain,
  Dark,
  Light,
  Topographic,
}

impl BaseLayer {
  pub const ALL: [BaseLayer; 6] = [
    BaseLayer::Street,
    BaseLayer::Satellite,
    BaseLayer::Terrain,
    BaseLayer::Dark,
    BaseLayer::Light,
    BaseLayer::Topographic,
  ];

  #[must_use]
  pub fn name(self) -> &'static str {
    match self {
      BaseLayer::Street => "Street",
      BaseLayer::Satellite => "Satellite",
      BaseLayer::Terrain => "Terrain",
      BaseLayer::Dark => "Dark",
      BaseLayer::Light => "Light",
      BaseLayer::Topographic => "Topographic",
    }
  }

  /// Tile URL with `{zoom}`, `{x}` and `{y}` placeholders.
  #[must_use]
  pub fn url_template(self) -> &'static str {
    match self {
      BaseLayer::Street => "https://tile.openstreetmap.org/{zoom}/{x}/{y}.png",
      BaseLayer::Satellite => {
        "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{zoom}/{y}/{x}"
      }
      BaseLayer::Terrain => {
        "https://server.arcgisonline.com/ArcGIS/rest/services/World_Terrain_Base/MapServer/tile/{zoom}/{y}/{x}"
      }
      BaseLayer::Dark => "https://a.basemaps.cartocdn.com/dark_all/{zoom}/{x}/{y}.png",
      BaseLayer::Light => "https://a.basemaps.cartocdn.com/light_all/{zoom}/{x}/{y}.png",
      BaseLayer::Topographic => "https://a.tile.opentopomap.org/{zoom}/{x}/{y}.png",
    }
  }

  #[must_use]
  pub fn attribution(self) -> &'static str {
    match self {
      BaseLayer::Street => "© OpenStreetMap contributors",
      BaseLayer::Satellite => "Tiles © Esri, Maxar, Earthstar Geographics",
      BaseLayer::Terrain => "Tiles © Esri, USGS, NOAA",
      BaseLayer::Dark | BaseLayer::Light => "© OpenStreetMap contributors © CARTO",
      BaseLayer::Topographic => "© OpenStreetMap contributors, SRTM | © OpenTopoMap (CC-BY-SA)",
    }
  }

  /// The deepest zoom the tile source serves.
  #[must_use]
  pub fn max_zoom(self) -> u8 {
    match self {
      BaseLayer::Street | BaseLayer::Satellite => 19,
      BaseLayer::Terrain => 13,
      BaseLayer::Dark | BaseLayer::Light => 20,
      BaseLayer::Topographic => 17,
    }
  }
}
