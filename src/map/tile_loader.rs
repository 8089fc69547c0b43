use crate::map::{coordinates::Tile, layers::BaseLayer};
use anyhow::{Result, anyhow};
use log::{debug, error, trace};
use std::collections::HashSet;
use std::fmt::Display;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use surf::http::Method;
use surf::{Config, Request, Url};
use surf_governor::GovernorMiddleware;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TileLoaderError {
  #[error("Tile not available.")]
  TileNotAvailableError { tile: Tile },
  #[error("Download already in progress.")]
  TileDownloadInProgressError { tile: Tile },
}

/// The encoded image data of a tile.
pub type TileData = Vec<u8>;

/// Determines if a tile should be downloaded or loaded from the cache.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum TileSource {
  All,
  Download,
  Cache,
}

impl Display for TileSource {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      TileSource::All => write!(f, "all"),
      TileSource::Download => write!(f, "download"),
      TileSource::Cache => write!(f, "cache"),
    }
  }
}

/// The interface of the cached and non-cached tile loader.
pub trait TileLoader {
  /// Tries to fetch the tile data asynchronously.
  async fn tile_data(&self, tile: &Tile, source: TileSource) -> Result<TileData>;
}

#[derive(Debug, Clone)]
struct TileCache {
  base_path: Option<PathBuf>,
}

impl TileCache {
  fn path(&self, tile: &Tile) -> Option<PathBuf> {
    self
      .base_path
      .as_ref()
      .map(|b| b.join(format!("{}_{}_{}.png", tile.zoom, tile.x, tile.y)))
  }

  fn cache_tile(&self, tile: &Tile, data: &[u8]) {
    let Some(path) = self.path(tile) else {
      return;
    };
    if let Err(e) = File::create(path).and_then(|mut f| f.write_all(data)) {
      debug!("Error when writing file: {e}");
    }
  }
}

impl TileLoader for TileCache {
  async fn tile_data(&self, tile: &Tile, tile_source: TileSource) -> Result<TileData> {
    if tile_source == TileSource::Download {
      return Err(TileLoaderError::TileNotAvailableError { tile: *tile }.into());
    }
    match self.path(tile) {
      Some(p) if p.exists() => Ok(fs::read(p)?),
      _ => Err(TileLoaderError::TileNotAvailableError { tile: *tile }.into()),
    }
  }
}

#[derive(Debug)]
struct TileDownloader {
  url_template: String,
  tiles_in_download: Arc<Mutex<HashSet<Tile>>>,
  client: surf::Client,
}

impl TileDownloader {
  fn from_url(url: &str) -> Result<Self> {
    let client: surf::Client = Config::new()
      .set_timeout(Some(Duration::from_secs(5)))
      .try_into()
      .map_err(|e| anyhow!("could not build http client: {e}"))?;
    let governor = GovernorMiddleware::per_second(10).map_err(|e| anyhow!("{e}"))?;
    Ok(Self {
      url_template: url.to_string(),
      tiles_in_download: Arc::default(),
      client: client.with(governor),
    })
  }

  fn get_path_for_tile(&self, tile: &Tile) -> String {
    self
      .url_template
      .replace("{x}", &tile.x.to_string())
      .replace("{y}", &tile.y.to_string())
      .replace("{zoom}", &tile.zoom.to_string())
  }

  fn finish(&self, tile: &Tile) {
    if let Ok(mut tiles_in_download) = self.tiles_in_download.lock() {
      tiles_in_download.remove(tile);
    }
  }
}

impl TileLoader for TileDownloader {
  async fn tile_data(&self, tile: &Tile, tile_source: TileSource) -> Result<TileData> {
    if tile_source == TileSource::Cache {
      return Err(TileLoaderError::TileNotAvailableError { tile: *tile }.into());
    }

    {
      let mut tiles_in_download = self
        .tiles_in_download
        .lock()
        .map_err(|_| anyhow!("download registry poisoned"))?;
      if !tiles_in_download.insert(*tile) {
        return Err(TileLoaderError::TileDownloadInProgressError { tile: *tile }.into());
      }
    }

    let url = self.get_path_for_tile(tile);
    let result = match Url::parse(&url) {
      Ok(url) => self
        .client
        .send(Request::new(Method::Get, url))
        .await
        .inspect_err(|e| error!("Error when downloading tile: {e}"))
        .map_err(|_| TileLoaderError::TileNotAvailableError { tile: *tile }),
      Err(e) => {
        error!("Invalid tile url {url}: {e}");
        Err(TileLoaderError::TileNotAvailableError { tile: *tile })
      }
    };
    let result = match result {
      Ok(mut response) if response.status() == 200 => response
        .body_bytes()
        .await
        .map_err(|_| TileLoaderError::TileNotAvailableError { tile: *tile }),
      Ok(mut response) => {
        error!(
          "Error when downloading tile: {}, {:?}",
          response.status(),
          response.body_string().await
        );
        Err(TileLoaderError::TileNotAvailableError { tile: *tile })
      }
      Err(e) => Err(e),
    };
    debug!("Downloaded {tile:?}.");
    self.finish(tile);

    Ok(result?)
  }
}

/// Downloads tiles of one base layer, keeping a disk cache per base layer.
#[derive(Debug)]
pub struct CachedTileLoader {
  base: BaseLayer,
  tile_cache: TileCache,
  tile_loader: TileDownloader,
}

impl CachedTileLoader {
  /// A loader for `base`. Tiles are cached below `cache_dir/<base layer>` if a directory is
  /// given.
  pub fn for_base(base: BaseLayer, cache_dir: Option<PathBuf>) -> Result<Self> {
    let tile_loader = TileDownloader::from_url(base.url_template())?;
    let cache_path = cache_dir.map(|p| p.join(base.name().to_lowercase()));
    Self::create_cache(cache_path.as_ref());
    Ok(Self {
      base,
      tile_cache: TileCache {
        base_path: cache_path,
      },
      tile_loader,
    })
  }

  #[must_use]
  pub fn base(&self) -> BaseLayer {
    self.base
  }

  #[must_use]
  pub fn cache_path(&self) -> Option<&PathBuf> {
    self.tile_cache.base_path.as_ref()
  }

  pub async fn get_from_cache(&self, tile: &Tile, tile_source: TileSource) -> Result<TileData> {
    self.tile_cache.tile_data(tile, tile_source).await
  }

  fn create_cache(cache_path: Option<&PathBuf>) {
    let Some(cache_path) = cache_path else { return };
    if cache_path.exists() {
      return;
    }
    let _ = fs::create_dir_all(cache_path).inspect_err(|e| {
      error!("Failed to create cache directory: {e}");
    });
  }

  async fn download(&self, tile: &Tile, tile_source: TileSource) -> Result<TileData> {
    let data = self.tile_loader.tile_data(tile, tile_source).await?;
    match data.len() {
      0..=100 => Err(TileLoaderError::TileNotAvailableError { tile: *tile }.into()),
      _ => {
        self.tile_cache.cache_tile(tile, &data);
        Ok(data)
      }
    }
  }
}

impl TileLoader for CachedTileLoader {
  async fn tile_data(&self, tile: &Tile, tile_source: TileSource) -> Result<TileData> {
    trace!("Loading {:?} tile {:?}", self.base, &tile);
    if let Ok(data) = self.get_from_cache(tile, tile_source).await {
      debug!("cache_hit: {tile:?}");
      Ok(data)
    } else {
      debug!("cache_miss: {tile:?}");
      self.download(tile, tile_source).await
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("civicmap-tiles-{name}-{}", std::process::id()))
  }

  #[test]
  fn cache_directory_per_base_layer() {
    let dir = temp_dir("per-base");
    let street = CachedTileLoader::for_base(BaseLayer::Street, Some(dir.clone())).unwrap();
    let dark = CachedTileLoader::for_base(BaseLayer::Dark, Some(dir.clone())).unwrap();
    assert_ne!(street.cache_path(), dark.cache_path());
    assert!(street.cache_path().unwrap().exists());
    let _ = fs::remove_dir_all(dir);
  }

  #[tokio::test]
  async fn cached_tile_is_served_without_download() {
    let dir = temp_dir("hit");
    let loader = CachedTileLoader::for_base(BaseLayer::Light, Some(dir.clone())).unwrap();
    let tile = Tile { x: 3, y: 5, zoom: 4 };
    let data = vec![7u8; 512];
    loader.tile_cache.cache_tile(&tile, &data);
    let loaded = loader.tile_data(&tile, TileSource::Cache).await.unwrap();
    assert_eq!(loaded, data);
    let missing = loader
      .tile_data(&Tile { x: 0, y: 0, zoom: 1 }, TileSource::Cache)
      .await;
    assert!(missing.is_err());
    let _ = fs::remove_dir_all(dir);
  }

  #[test]
  fn url_template_substitution() {
    let downloader = TileDownloader::from_url(BaseLayer::Satellite.url_template()).unwrap();
    let url = downloader.get_path_for_tile(&Tile { x: 1, y: 2, zoom: 3 });
    assert!(url.ends_with("/tile/3/2/1"));
  }
}
