use std::{
  collections::{HashMap, HashSet},
  path::PathBuf,
  sync::{
    Arc, Mutex,
    mpsc::{Receiver, Sender, channel},
  },
  time::{Duration, Instant},
};

use anyhow::{Context as _, Result};
use egui::{Color32, ColorImage, Painter, Pos2, Rect, TextureHandle, TextureOptions};

use super::BaseLayer;
use crate::map::{
  coordinates::{Tile, tiles_in_box},
  tile_loader::{CachedTileLoader, TileLoader, TileSource},
  viewport::Viewport,
};

type LoadedTile = (BaseLayer, Tile, ColorImage);
type TileKey = (BaseLayer, Tile);

/// Decoded textures kept per base layer before the least recently drawn are dropped.
pub const MAX_TILES_PER_LAYER: usize = 512;

const FIRST_RETRY: Duration = Duration::from_secs(2);
const MAX_RETRY: Duration = Duration::from_secs(300);

/// Wait before retrying a tile that failed `failures` times in a row.
#[must_use]
pub fn retry_delay(failures: u32) -> Duration {
  FIRST_RETRY
    .saturating_mul(1 << failures.saturating_sub(1).min(16))
    .min(MAX_RETRY)
}

#[derive(Debug, Clone, Copy)]
struct Backoff {
  failures: u32,
  retry_at: Instant,
}

/// Tiles whose last fetch failed, with the earliest time they may be requested again.
#[derive(Debug, Default)]
struct FailedTiles(HashMap<TileKey, Backoff>);

impl FailedTiles {
  fn record(&mut self, key: TileKey, now: Instant) {
    let failures = self.0.get(&key).map_or(1, |b| b.failures + 1);
    self.0.insert(
      key,
      Backoff {
        failures,
        retry_at: now + retry_delay(failures),
      },
    );
  }

  fn clear(&mut self, key: &TileKey) {
    self.0.remove(key);
  }

  fn may_request(&self, key: &TileKey, now: Instant) -> bool {
    self.0.get(key).is_none_or(|b| now >= b.retry_at)
  }
}

struct CachedTexture {
  texture: TextureHandle,
  last_used: u64,
}

/// Decodes PNG/JPEG tile data.
pub fn decode_tile(tile: &Tile, data: &[u8]) -> Result<ColorImage> {
  let img = image::ImageReader::new(std::io::Cursor::new(data))
    .with_guessed_format()
    .with_context(|| format!("Failed to create image reader for {tile:?}"))?
    .decode()
    .with_context(|| format!("Failed to decode image for {tile:?}"))?;
  let size = [img.width() as usize, img.height() as usize];
  let image_buffer = img.to_rgba8();
  let pixels = image_buffer.as_flat_samples();
  Ok(ColorImage::from_rgba_unmultiplied(size, pixels.as_slice()))
}

/// Loads and draws the tiles of the active base layer. Textures are kept per base layer, so
/// switching back to a layer shows its tiles immediately.
pub struct TileLayer {
  receiver: Receiver<LoadedTile>,
  sender: Sender<LoadedTile>,
  cache_dir: Option<PathBuf>,
  loaders: HashMap<BaseLayer, Arc<CachedTileLoader>>,
  loaded_tiles: HashMap<BaseLayer, HashMap<Tile, CachedTexture>>,
  in_flight: Arc<Mutex<HashSet<TileKey>>>,
  failed: Arc<Mutex<FailedTiles>>,
  max_tiles: usize,
  frame: u64,
  ctx: egui::Context,
}

impl TileLayer {
  #[must_use]
  pub fn new(ctx: egui::Context, cache_dir: Option<PathBuf>) -> Self {
    let (sender, receiver) = channel();
    Self {
      receiver,
      sender,
      cache_dir,
      loaders: HashMap::new(),
      loaded_tiles: HashMap::new(),
      in_flight: Arc::default(),
      failed: Arc::default(),
      max_tiles: MAX_TILES_PER_LAYER,
      frame: 0,
      ctx,
    }
  }

  /// Number of decoded tiles held for `base`.
  #[must_use]
  pub fn cached_tile_count(&self, base: BaseLayer) -> usize {
    self.loaded_tiles.get(&base).map_or(0, HashMap::len)
  }

  fn loader(&mut self, base: BaseLayer) -> Option<Arc<CachedTileLoader>> {
    if let Some(loader) = self.loaders.get(&base) {
      return Some(loader.clone());
    }
    match CachedTileLoader::for_base(base, self.cache_dir.clone()) {
      Ok(loader) => {
        let loader = Arc::new(loader);
        self.loaders.insert(base, loader.clone());
        Some(loader)
      }
      Err(e) => {
        log::error!("Could not create tile loader for {}: {e}", base.name());
        None
      }
    }
  }

  fn collect_new_tiles(&mut self) {
    for (base, tile, image) in self.receiver.try_iter() {
      let texture = self.ctx.load_texture(
        format!("{}-{}-{}-{}", base.name(), tile.zoom, tile.x, tile.y),
        image,
        TextureOptions::LINEAR,
      );
      let tiles = self.loaded_tiles.entry(base).or_default();
      tiles.insert(
        tile,
        CachedTexture {
          texture,
          last_used: self.frame,
        },
      );
      Self::evict(tiles, self.max_tiles);
    }
  }

  /// Drops the least recently drawn textures beyond `max_tiles`.
  fn evict(tiles: &mut HashMap<Tile, CachedTexture>, max_tiles: usize) {
    let excess = tiles.len().saturating_sub(max_tiles);
    if excess == 0 {
      return;
    }
    let mut by_age: Vec<(u64, Tile)> = tiles.iter().map(|(t, c)| (c.last_used, *t)).collect();
    by_age.sort_unstable_by_key(|(last_used, _)| *last_used);
    for (_, tile) in by_age.into_iter().take(excess) {
      tiles.remove(&tile);
    }
    log::trace!("Evicted {excess} tile textures");
  }

  fn request(&mut self, base: BaseLayer, tile: Tile) {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
      return;
    };
    if !self
      .failed
      .lock()
      .is_ok_and(|failed| failed.may_request(&(base, tile), Instant::now()))
    {
      return;
    }
    {
      let Ok(mut in_flight) = self.in_flight.lock() else {
        return;
      };
      if !in_flight.insert((base, tile)) {
        return;
      }
    }
    let Some(loader) = self.loader(base) else {
      return;
    };
    let sender = self.sender.clone();
    let ctx = self.ctx.clone();
    let in_flight = self.in_flight.clone();
    let failed = self.failed.clone();
    handle.spawn(async move {
      let result = loader.tile_data(&tile, TileSource::All).await;
      let image = result.and_then(|data| decode_tile(&tile, &data));
      let Ok(mut failed) = failed.lock() else {
        return;
      };
      match image {
        Ok(image) => {
          failed.clear(&(base, tile));
          if sender.send((base, tile, image)).is_err() {
            log::debug!("Tile layer dropped before {tile:?} arrived");
          }
          ctx.request_repaint();
        }
        Err(e) => {
          failed.record((base, tile), Instant::now());
          log::debug!("Tile {tile:?} unavailable: {e}");
        }
      }
      drop(failed);
      if let Ok(mut in_flight) = in_flight.lock() {
        in_flight.remove(&(base, tile));
      }
    });
  }

  fn tile_rect(tile: &Tile, viewport: &Viewport, origin: Pos2) -> Rect {
    let (nw, se) = tile.position();
    let nw: Pos2 = viewport.project(nw).into();
    let se: Pos2 = viewport.project(se).into();
    Rect::from_min_max(nw, se).translate(origin.to_vec2())
  }

  /// The texture of `tile` or of its closest loaded ancestor with the matching uv section.
  /// The texture found is marked as drawn in the current frame.
  fn texture_for(&mut self, base: BaseLayer, tile: Tile) -> Option<(&TextureHandle, Rect)> {
    let tiles = self.loaded_tiles.get_mut(&base)?;
    let mut current = tile;
    let mut uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1., 1.));
    loop {
      if tiles.contains_key(&current) {
        let cached = tiles.get_mut(&current)?;
        cached.last_used = self.frame;
        return Some((&cached.texture, uv));
      }
      let parent = current.parent()?;
      let half = |v: f32, odd: bool| if odd { 0.5 + v / 2. } else { v / 2. };
      let (odd_x, odd_y) = (current.x % 2 == 1, current.y % 2 == 1);
      uv = Rect::from_min_max(
        Pos2::new(half(uv.min.x, odd_x), half(uv.min.y, odd_y)),
        Pos2::new(half(uv.max.x, odd_x), half(uv.max.y, odd_y)),
      );
      current = parent;
    }
  }

  #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
  pub fn draw(&mut self, painter: &Painter, rect: Rect, viewport: &Viewport, base: BaseLayer) {
    self.frame += 1;
    self.collect_new_tiles();
    let zoom = viewport.zoom.round().clamp(0., f64::from(base.max_zoom())) as u8;
    let bounds = viewport.world_bounds();
    let visible: Vec<Tile> = tiles_in_box(bounds.north_west(), bounds.south_east(), zoom).collect();
    for tile in visible {
      let tile_rect = Self::tile_rect(&tile, viewport, rect.min);
      match self.texture_for(base, tile) {
        Some((texture, uv)) => {
          painter.image(texture.id(), tile_rect, uv, Color32::WHITE);
        }
        None => {
          painter.rect_filled(tile_rect, egui::CornerRadius::ZERO, Color32::from_gray(230));
        }
      }
      if !self
        .loaded_tiles
        .get(&base)
        .is_some_and(|tiles| tiles.contains_key(&tile))
      {
        self.request(base, tile);
      }
    }
    painter.text(
      rect.right_bottom() - egui::vec2(4., 4.),
      egui::Align2::RIGHT_BOTTOM,
      base.attribution(),
      egui::FontId::proportional(10.),
      Color32::from_gray(60),
    );
  }
}
