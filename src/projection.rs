//! # Coordinate Mapper
//!
//! Conversions between geographic degrees and the slippy-map tile space
//! (spherical Mercator, as used by OpenStreetMap and most tile servers).
//!
//! At zoom `z` the world is a square of `2^z × 2^z` tiles. Continuous tile
//! coordinates carry the position inside a tile in their fractional part;
//! the integer part is the tile index.
//!
//! | Function | Direction |
//! |----------|-----------|
//! | [`project`] | degrees → continuous tile coordinates |
//! | [`tile_index`] | degrees → integer tile index (truncated) |
//! | [`unproject`] | tile coordinates → degrees of the tile's north-west corner |
//!
//! Reference: [Slippy map tilenames](https://wiki.openstreetmap.org/wiki/Slippy_map_tilenames)
//!
//! ## Example
//!
//! ```rust
//! use activity_heatmap::projection;
//!
//! let (x, y) = projection::project(50.7742, 6.0745, 13);
//! assert!((x - 4234.228622222222).abs() < 1e-8);
//! assert_eq!(projection::tile_index(50.7742, 6.0745, 13), (4234, 2750));
//! ```

use std::f64::consts::PI;
use std::fmt;

use crate::error::HeatmapError;

/// Highest zoom level served by common tile servers.
pub const MAX_ZOOM: u8 = 19;

/// Latitude where the Mercator square ends, `atan(sinh(π))` in degrees.
pub const MAX_LATITUDE: f64 = 85.0511287798;

/// Project a latitude/longitude pair onto continuous tile coordinates.
///
/// Latitude must lie strictly between -90 and 90 degrees; the poles map to
/// infinity. Longitude is not wrapped.
#[inline]
pub fn project(lat_deg: f64, lon_deg: f64, zoom: u8) -> (f64, f64) {
    let lat_rad = lat_deg.to_radians();
    let n = world_tiles(zoom);
    let x = (lon_deg + 180.0) / 360.0 * n;
    let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n;
    (x, y)
}

/// Distance to a tile edge below which a coordinate counts as on the edge.
/// Absorbs the rounding of an [`unproject`]/[`project`] round trip.
const EDGE_EPSILON: f64 = 1e-6;

/// Tile index containing a point: [`project`] truncated toward zero.
///
/// This is not plain truncation. A projected coordinate within
/// [`EDGE_EPSILON`] (1e-6 tile) of an integer snaps to that integer first,
/// so `4233.9999995` gives `4234` where `trunc` would give `4233`. Tile
/// corners from [`unproject`] therefore map back to their own tile. Away
/// from edges the result equals `trunc`.
#[inline]
pub fn tile_index(lat_deg: f64, lon_deg: f64, zoom: u8) -> (i64, i64) {
    let (x, y) = project(lat_deg, lon_deg, zoom);
    (truncate(x), truncate(y))
}

#[inline]
fn truncate(v: f64) -> i64 {
    let nearest = v.round();
    if (v - nearest).abs() < EDGE_EPSILON {
        nearest as i64
    } else {
        v.trunc() as i64
    }
}

/// Inverse of [`project`]. For integer inputs this is the north-west corner
/// of the tile.
#[inline]
pub fn unproject(x: f64, y: f64, zoom: u8) -> (f64, f64) {
    let n = world_tiles(zoom);
    let lon_deg = x / n * 360.0 - 180.0;
    let lat_rad = (PI * (1.0 - 2.0 * y / n)).sinh().atan();
    (lat_rad.to_degrees(), lon_deg)
}

/// Number of tiles along one axis at `zoom`.
#[inline]
pub fn world_tiles(zoom: u8) -> f64 {
    2f64.powi(zoom as i32)
}

/// Checked entry for points that come from configuration rather than data.
pub fn checked_tile_index(lat_deg: f64, lon_deg: f64, zoom: u8) -> Result<(i64, i64), HeatmapError> {
    if zoom > MAX_ZOOM {
        return Err(HeatmapError::InvalidZoom(zoom));
    }
    if !lat_deg.is_finite() || lat_deg.abs() >= 90.0 {
        return Err(HeatmapError::InvalidLatitude(lat_deg));
    }
    Ok(tile_index(lat_deg, lon_deg, zoom))
}

/// A discrete tile address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TileCoord {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub fn new(zoom: u8, x: u32, y: u32) -> Self {
        Self { zoom, x, y }
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// Inclusive rectangle of tile indices at one zoom level.
///
/// Construction guarantees `x_min <= x_max` and `y_min <= y_max`, with all
/// indices inside `[0, 2^zoom)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TileRange {
    pub zoom: u8,
    pub x_min: u32,
    pub x_max: u32,
    pub y_min: u32,
    pub y_max: u32,
}

impl TileRange {
    /// Tile range covering a geographic box.
    ///
    /// The south-west corner gives `(x_min, y_max)` and the north-east corner
    /// gives `(x_max, y_min)`, since tile rows grow southwards. Indices past
    /// the edge of the world are clamped onto it.
    pub fn covering(
        lat_min: f64,
        lat_max: f64,
        lon_min: f64,
        lon_max: f64,
        zoom: u8,
    ) -> Result<Self, HeatmapError> {
        let (x_a, y_a) = checked_tile_index(lat_min, lon_min, zoom)?;
        let (x_b, y_b) = checked_tile_index(lat_max, lon_max, zoom)?;

        let last = world_tiles(zoom) as i64 - 1;
        let clamp = |v: i64| v.clamp(0, last) as u32;

        Ok(Self {
            zoom,
            x_min: clamp(x_a.min(x_b)),
            x_max: clamp(x_a.max(x_b)),
            y_min: clamp(y_a.min(y_b)),
            y_max: clamp(y_a.max(y_b)),
        })
    }

    /// The one tile containing a point. The latitude is clamped into the
    /// Mercator square and the index onto the world, so any finite point
    /// has a tile.
    pub fn containing(lat_deg: f64, lon_deg: f64, zoom: u8) -> Result<Self, HeatmapError> {
        let lat = lat_deg.clamp(-MAX_LATITUDE, MAX_LATITUDE);
        let (x, y) = checked_tile_index(lat, lon_deg, zoom)?;

        let last = world_tiles(zoom) as i64 - 1;
        let x = x.clamp(0, last) as u32;
        let y = y.clamp(0, last) as u32;
        Ok(Self {
            zoom,
            x_min: x,
            x_max: x,
            y_min: y,
            y_max: y,
        })
    }

    pub fn cols(&self) -> u32 {
        self.x_max - self.x_min + 1
    }

    pub fn rows(&self) -> u32 {
        self.y_max - self.y_min + 1
    }

    /// `(x_max - x_min + 1) * (y_max - y_min + 1)`
    pub fn tile_count(&self) -> usize {
        self.cols() as usize * self.rows() as usize
    }

    /// Every tile in the range, column by column.
    pub fn coords(&self) -> impl Iterator<Item = TileCoord> + '_ {
        (self.x_min..=self.x_max)
            .flat_map(move |x| (self.y_min..=self.y_max).map(move |y| TileCoord::new(self.zoom, x, y)))
    }
}
