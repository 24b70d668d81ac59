//! Error types for rendering, tile acquisition and track decoding.

use std::path::PathBuf;

use thiserror::Error;

use crate::projection::TileCoord;

/// Errors that abort a render.
///
/// Tile failures never show up here: the mosaic replaces unavailable
/// tiles with a placeholder and keeps going.
#[derive(Debug, Error)]
pub enum HeatmapError {
    #[error("latitude {0} is outside the projectable range (-90, 90)")]
    InvalidLatitude(f64),
    #[error("zoom level {0} is not supported (max {max})", max = crate::projection::MAX_ZOOM)]
    InvalidZoom(u8),
    #[error("sigma must be at least one pixel")]
    InvalidSigma,
    #[error("tile size must be non-zero")]
    InvalidTileSize,
    #[error("bounding box is empty: lat {lat_min}..{lat_max}, lon {lon_min}..{lon_max}")]
    InvalidBounds {
        lat_min: f64,
        lat_max: f64,
        lon_min: f64,
        lon_max: f64,
    },
    #[error("{count} tiles requested, the maximum is {max}; lower the zoom or shrink the bounds")]
    TooManyTiles { count: usize, max: usize },
    #[error("io {0}")]
    Io(#[from] std::io::Error),
    #[error("image {0}")]
    Image(#[from] image::ImageError),
    #[cfg(feature = "serde")]
    #[error("config {0}")]
    Config(#[from] serde_json::Error),
}

/// Signals that a provider could not supply a tile.
#[derive(Debug, Error)]
pub enum TileError {
    #[error("tile {coord} unavailable: {reason}")]
    Unavailable { coord: TileCoord, reason: String },
    #[error("tile {coord} is {width}x{height}, expected {expected}x{expected}")]
    SizeMismatch {
        coord: TileCoord,
        width: u32,
        height: u32,
        expected: u32,
    },
    #[error("tile decode {0}")]
    Decode(#[from] image::ImageError),
    #[error("io {0}")]
    Io(#[from] std::io::Error),
    #[error("tile cache {0}")]
    Cache(String),
    #[cfg(feature = "http")]
    #[error("http {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors raised while decoding a recorded track.
#[derive(Debug, Error)]
pub enum TrackError {
    #[error("io {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported track format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("gpx {0}")]
    Gpx(String),
    #[error("fit {0}")]
    Fit(String),
}
