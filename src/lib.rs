//! # Activity Heatmap
//!
//! Density heatmaps of recorded GPS activities, rendered over slippy-map tiles.
//!
//! This library provides:
//! - Spherical-Mercator projection onto the tile pixel grid
//! - A dark, inverted-luminance base map stitched from map tiles
//! - Trackpoint density with per-pixel clamping scaled by activity count
//! - Frequency-domain box smoothing and colour-ramp compositing
//! - Readers for GPX, FIT and gzip-wrapped track files
//!
//! ## Features
//!
//! - **`parallel`** - Decode track files in parallel with rayon
//! - **`http`** - Enable the HTTP tile provider
//! - **`serde`** - Serde derives and JSON configuration loading
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use activity_heatmap::{render_heatmap, GpsPoint, HeatmapConfig, PlaceholderTiles};
//!
//! let points = vec![
//!     GpsPoint::new(50.7742, 6.0745),
//!     GpsPoint::new(50.7750, 6.0760),
//!     GpsPoint::new(50.7761, 6.0781),
//! ];
//!
//! let config = HeatmapConfig::default().with_zoom(12);
//! let image = render_heatmap(&points, 1, &config, &PlaceholderTiles).unwrap();
//! assert_eq!(image.width() % 256, 0);
//! ```

pub mod error;
pub use error::{HeatmapError, TileError, TrackError};

pub mod config;
pub use config::HeatmapConfig;

// Coordinate mapper
pub mod projection;
pub use projection::{project, tile_index, unproject, TileCoord, TileRange};

pub mod geo_utils;

// Tile acquisition and caching
pub mod tiles;
pub use tiles::{
    tile_file_name, tile_url, CachedTileProvider, FileTileCache, MemoryTileCache,
    PlaceholderTiles, TileCache, TileImage, TileProvider,
};

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::HttpTileProvider;

// Render pipeline stages
pub mod mosaic;
pub use mosaic::{build_supertile, Supertile};

pub mod density;
pub use density::{accumulate_density, DensityGrid};

pub mod smoothing;
pub use smoothing::{box_filter, kernel_width, normalize, smooth_density};

pub mod colormap;
pub use colormap::ColorRamp;

pub mod heatmap;
pub use heatmap::{composite, render_heatmap, HeatmapImage};

// Collaborators around the engine
pub mod fit;
pub mod tracks;
pub use tracks::{read_track, read_tracks, TrackCollection, TrackFormat};

pub mod period;
pub use period::{output_file_name, MonthSelection};

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use activity_heatmap::GpsPoint;
/// let point = GpsPoint::new(51.5074, -0.1278); // London
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Geographic bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    pub fn new(min_lat: f64, max_lat: f64, min_lng: f64, max_lng: f64) -> Self {
        Self { min_lat, max_lat, min_lng, max_lng }
    }

    /// The whole globe, poles included. Only usable for filtering: the poles
    /// cannot be projected, so equal-extent renders need tighter bounds.
    pub fn world() -> Self {
        Self::new(-90.0, 90.0, -180.0, 180.0)
    }

    /// Strict containment; points on the border are outside.
    pub fn contains(&self, point: &GpsPoint) -> bool {
        point.latitude > self.min_lat
            && point.latitude < self.max_lat
            && point.longitude > self.min_lng
            && point.longitude < self.max_lng
    }

    /// Midpoint of the box; frames renders that have no points.
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::world()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_contains_is_strict() {
        let bounds = Bounds::new(50.0, 51.0, 6.0, 7.0);
        assert!(bounds.contains(&GpsPoint::new(50.5, 6.5)));
        assert!(!bounds.contains(&GpsPoint::new(50.0, 6.5)));
        assert!(!bounds.contains(&GpsPoint::new(50.5, 7.0)));
    }

    #[test]
    fn test_bounds_center() {
        let center = Bounds::new(50.0, 51.0, 6.0, 7.0).center();
        assert_eq!(center, GpsPoint::new(50.5, 6.5));
    }
}
