//! Tile Mosaic Builder.
//!
//! Stitches the tiles of a [`TileRange`] into one canvas (the "supertile")
//! and turns it into a dark base map: Rec. 709 luma, inverted, replicated
//! back into three channels.

use std::time::Instant;

use image::{imageops, ImageBuffer, Rgb, Rgb32FImage};
use log::{info, warn};

use crate::error::{HeatmapError, TileError};
use crate::projection::{TileCoord, TileRange};
use crate::tiles::{TileImage, TileProvider};

/// Rec. 709 luma weights.
pub const LUMA_WEIGHTS: [f64; 3] = [0.2126, 0.7152, 0.0722];

/// The assembled base map of one render.
#[derive(Debug, Clone)]
pub struct Supertile {
    range: TileRange,
    tile_size: u32,
    image: Rgb32FImage,
}

impl Supertile {
    pub fn range(&self) -> &TileRange {
        &self.range
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// `cols * tile_size`
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// `rows * tile_size`
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> [f32; 3] {
        self.image.get_pixel(x, y).0
    }

    pub fn image(&self) -> &Rgb32FImage {
        &self.image
    }
}

/// Refuse tile rectangles larger than the configured maximum.
pub fn check_tile_count(range: &TileRange, max_tile_count: usize) -> Result<(), HeatmapError> {
    let count = range.tile_count();
    if count > max_tile_count {
        return Err(HeatmapError::TooManyTiles {
            count,
            max: max_tile_count,
        });
    }
    Ok(())
}

/// Build the inverted grayscale base map for `range`.
///
/// The tile count is checked before the provider is asked for anything.
/// Tiles the provider cannot deliver, or that have the wrong size, are
/// replaced by a blank tile so the mosaic is always complete.
pub fn build_supertile<P: TileProvider + ?Sized>(
    range: &TileRange,
    tile_size: u32,
    max_tile_count: usize,
    provider: &P,
) -> Result<Supertile, HeatmapError> {
    check_tile_count(range, max_tile_count)?;

    let start = Instant::now();
    let coords: Vec<_> = range.coords().collect();
    info!(
        "[Mosaic] Assembling {}x{} tiles at zoom {} (x {}..={}, y {}..={})",
        range.cols(),
        range.rows(),
        range.zoom,
        range.x_min,
        range.x_max,
        range.y_min,
        range.y_max
    );

    let mut canvas: Rgb32FImage =
        ImageBuffer::new(range.cols() * tile_size, range.rows() * tile_size);
    let mut placeholders = 0;

    for (coord, result) in provider.tiles(&coords) {
        let tile = match result.and_then(|tile| check_size(tile, coord, tile_size)) {
            Ok(tile) => tile,
            Err(e) => {
                warn!("[Mosaic] Using placeholder for tile {}: {}", coord, e);
                placeholders += 1;
                TileImage::blank(tile_size)
            }
        };
        let left = (coord.x - range.x_min) * tile_size;
        let top = (coord.y - range.y_min) * tile_size;
        imageops::replace(&mut canvas, tile.pixels(), left as i64, top as i64);
    }

    for pixel in canvas.pixels_mut() {
        let [r, g, b] = pixel.0;
        let luma = LUMA_WEIGHTS[0] * r as f64 + LUMA_WEIGHTS[1] * g as f64 + LUMA_WEIGHTS[2] * b as f64;
        let inverted = (1.0 - luma) as f32;
        *pixel = Rgb([inverted; 3]);
    }

    info!(
        "[Mosaic] Built {}x{} px supertile from {} tiles ({} placeholders) in {:?}",
        canvas.width(),
        canvas.height(),
        coords.len(),
        placeholders,
        start.elapsed()
    );

    Ok(Supertile {
        range: *range,
        tile_size,
        image: canvas,
    })
}

fn check_size(tile: TileImage, coord: TileCoord, expected: u32) -> Result<TileImage, TileError> {
    if tile.width() != expected || tile.height() != expected {
        return Err(TileError::SizeMismatch {
            coord,
            width: tile.width(),
            height: tile.height(),
            expected,
        });
    }
    Ok(tile)
}
