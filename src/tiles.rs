//! Map tile acquisition.
//!
//! The render pipeline only sees [`TileProvider`]. Caching is a separate
//! [`TileCache`] concern, combined with any upstream provider through
//! [`CachedTileProvider`]:
//!
//! ```text
//! mosaic -> CachedTileProvider -> TileCache (lookup / store)
//!                              -> upstream provider (e.g. HTTP)
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use image::{ImageBuffer, Rgb, Rgb32FImage};
use log::{debug, warn};

use crate::error::TileError;
use crate::projection::TileCoord;

/// URL of a tile on a `{base}/{zoom}/{x}/{y}.png` server.
pub fn tile_url(base_url: &str, coord: TileCoord) -> String {
    format!(
        "{}/{}/{}/{}.png",
        base_url.trim_end_matches('/'),
        coord.zoom,
        coord.x,
        coord.y
    )
}

/// File name of a cached tile: `tile_{zoom}_{x}_{y}.png`.
pub fn tile_file_name(coord: TileCoord) -> String {
    format!("tile_{}_{}_{}.png", coord.zoom, coord.x, coord.y)
}

/// A square RGB tile with channel values in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct TileImage {
    pixels: Rgb32FImage,
}

impl TileImage {
    pub fn from_rgb32f(pixels: Rgb32FImage) -> Self {
        Self { pixels }
    }

    /// Uniform white tile, used in place of tiles that could not be fetched.
    /// White inverts to black on the base map.
    pub fn blank(size: u32) -> Self {
        Self::filled(size, 1.0)
    }

    pub fn filled(size: u32, value: f32) -> Self {
        Self {
            pixels: ImageBuffer::from_pixel(size, size, Rgb([value; 3])),
        }
    }

    /// Decode an encoded image (PNG, ...). Alpha is dropped and 8/16-bit
    /// channels are scaled to [0, 1].
    pub fn decode(bytes: &[u8]) -> Result<Self, TileError> {
        let decoded = image::load_from_memory(bytes)?;
        Ok(Self::from_rgb32f(decoded.to_rgb32f()))
    }

    pub fn open(path: &Path) -> Result<Self, TileError> {
        let bytes = std::fs::read(path)?;
        Self::decode(&bytes)
    }

    /// Write as an 8-bit PNG.
    pub fn save_png(&self, path: &Path) -> Result<(), TileError> {
        let rgb8 = image::DynamicImage::ImageRgb32F(self.pixels.clone()).to_rgb8();
        rgb8.save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> [f32; 3] {
        self.pixels.get_pixel(x, y).0
    }

    pub fn pixels(&self) -> &Rgb32FImage {
        &self.pixels
    }
}

/// Source of map tiles addressed by (zoom, x, y).
///
/// An `Err` means the tile is unavailable; callers recover by substituting
/// a placeholder.
pub trait TileProvider {
    fn tile(&self, coord: TileCoord) -> Result<TileImage, TileError>;

    /// Fetch several tiles at once. Providers that can overlap requests
    /// override this; the default asks for each tile in turn.
    fn tiles(&self, coords: &[TileCoord]) -> Vec<(TileCoord, Result<TileImage, TileError>)> {
        coords.iter().map(|&coord| (coord, self.tile(coord))).collect()
    }
}

impl<P: TileProvider + ?Sized> TileProvider for &P {
    fn tile(&self, coord: TileCoord) -> Result<TileImage, TileError> {
        (**self).tile(coord)
    }

    fn tiles(&self, coords: &[TileCoord]) -> Vec<(TileCoord, Result<TileImage, TileError>)> {
        (**self).tiles(coords)
    }
}

/// Offline provider: every tile is a blank 256 pixel tile.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderTiles;

impl TileProvider for PlaceholderTiles {
    fn tile(&self, _coord: TileCoord) -> Result<TileImage, TileError> {
        Ok(TileImage::blank(256))
    }
}

/// Storage for previously fetched tiles.
pub trait TileCache {
    fn lookup(&self, coord: TileCoord) -> Option<TileImage>;
    fn store(&self, coord: TileCoord, tile: &TileImage) -> Result<(), TileError>;
}

/// Tiles kept as `tile_{zoom}_{x}_{y}.png` files in one directory.
#[derive(Debug, Clone)]
pub struct FileTileCache {
    dir: PathBuf,
}

impl FileTileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, coord: TileCoord) -> PathBuf {
        self.dir.join(tile_file_name(coord))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl TileCache for FileTileCache {
    fn lookup(&self, coord: TileCoord) -> Option<TileImage> {
        let path = self.path_for(coord);
        if !path.is_file() {
            return None;
        }
        match TileImage::open(&path) {
            Ok(tile) => Some(tile),
            Err(e) => {
                warn!("[TileCache] Ignoring unreadable {}: {}", path.display(), e);
                None
            }
        }
    }

    fn store(&self, coord: TileCoord, tile: &TileImage) -> Result<(), TileError> {
        std::fs::create_dir_all(&self.dir)?;
        tile.save_png(&self.path_for(coord))
    }
}

/// In-process cache, mostly for tests and repeated renders of one series.
#[derive(Debug, Default)]
pub struct MemoryTileCache {
    tiles: Mutex<HashMap<TileCoord, TileImage>>,
}

impl MemoryTileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tiles.lock().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TileCache for MemoryTileCache {
    fn lookup(&self, coord: TileCoord) -> Option<TileImage> {
        self.tiles.lock().ok()?.get(&coord).cloned()
    }

    fn store(&self, coord: TileCoord, tile: &TileImage) -> Result<(), TileError> {
        let mut tiles = self
            .tiles
            .lock()
            .map_err(|_| TileError::Cache(format!("memory cache lock poisoned storing {}", coord)))?;
        tiles.insert(coord, tile.clone());
        Ok(())
    }
}

/// Serves tiles from a cache, fetching and storing misses upstream.
///
/// Failed fetches are not stored, so they are retried next time.
pub struct CachedTileProvider<C, P> {
    cache: C,
    upstream: P,
}

impl<C: TileCache, P: TileProvider> CachedTileProvider<C, P> {
    pub fn new(cache: C, upstream: P) -> Self {
        Self { cache, upstream }
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    fn remember(&self, coord: TileCoord, tile: &TileImage) {
        if let Err(e) = self.cache.store(coord, tile) {
            warn!("[TileCache] Failed to store tile {}: {}", coord, e);
        }
    }
}

impl<C: TileCache, P: TileProvider> TileProvider for CachedTileProvider<C, P> {
    fn tile(&self, coord: TileCoord) -> Result<TileImage, TileError> {
        if let Some(tile) = self.cache.lookup(coord) {
            debug!("[TileCache] Hit {}", coord);
            return Ok(tile);
        }
        let tile = self.upstream.tile(coord)?;
        self.remember(coord, &tile);
        Ok(tile)
    }

    fn tiles(&self, coords: &[TileCoord]) -> Vec<(TileCoord, Result<TileImage, TileError>)> {
        let mut results = Vec::with_capacity(coords.len());
        let mut misses = Vec::new();

        for &coord in coords {
            match self.cache.lookup(coord) {
                Some(tile) => results.push((coord, Ok(tile))),
                None => misses.push(coord),
            }
        }

        debug!(
            "[TileCache] {} hits, {} misses",
            coords.len() - misses.len(),
            misses.len()
        );

        if !misses.is_empty() {
            for (coord, result) in self.upstream.tiles(&misses) {
                if let Ok(tile) = &result {
                    self.remember(coord, tile);
                }
                results.push((coord, result));
            }
        }

        results
    }
}
