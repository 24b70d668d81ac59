//! Density Accumulator.
//!
//! Bins trackpoints into a per-pixel histogram aligned with the supertile.
//! Each point adds 1 to every cell of a `(2w+1)×(2w+1)` window around its
//! pixel, then every cell is capped at
//!
//! ```text
//! m = (1/5) · pixel_res · activity_count
//! ```
//!
//! where `pixel_res` is the ground resolution in meters per pixel at the
//! mean latitude of the points. The `1/5` is one trackpoint per five meters
//! of track, a typical recording interval for cycling. The cap keeps a
//! stationary cluster (a café stop, a traffic light) from saturating the map.

use log::{debug, info};

use crate::geo_utils::ground_resolution;
use crate::projection::{project, TileRange};
use crate::GpsPoint;

/// Recorded trackpoints per meter of track.
pub const TRACKPOINTS_PER_METER: f64 = 1.0 / 5.0;

/// Row-major 2-D grid of densities.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityGrid {
    width: usize,
    height: usize,
    data: Vec<f64>,
}

impl DensityGrid {
    pub fn zeros(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    pub fn from_vec(width: usize, height: usize, data: Vec<f64>) -> Self {
        assert_eq!(data.len(), width * height, "grid data does not match {}x{}", width, height);
        Self { width, height, data }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.width + col] = value;
    }

    pub fn values(&self) -> &[f64] {
        &self.data
    }

    pub fn into_values(self) -> Vec<f64> {
        self.data
    }

    /// (min, max) over all cells; `None` for an empty grid.
    pub fn min_max(&self) -> Option<(f64, f64)> {
        let mut iter = self.data.iter().copied();
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }

    /// Position of the largest cell as (row, col).
    pub fn argmax(&self) -> Option<(usize, usize)> {
        let (index, _) = self
            .data
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
                Some((_, b)) if b >= v => best,
                _ => Some((i, v)),
            })?;
        Some((index / self.width, index % self.width))
    }

    /// Cap every cell at `max`.
    pub fn clamp_max(&mut self, max: f64) {
        for v in self.data.iter_mut() {
            if *v > max {
                *v = max;
            }
        }
    }
}

/// Per-pixel cap for a set of activities at a mean latitude.
pub fn max_accumulation(mean_latitude: f64, zoom: u8, activity_count: u32) -> f64 {
    TRACKPOINTS_PER_METER * ground_resolution(mean_latitude, zoom) * activity_count as f64
}

/// Incremental density builder over one supertile's pixel grid.
pub struct DensityAccumulator {
    grid: DensityGrid,
    zoom: u8,
    origin_x: f64,
    origin_y: f64,
    tile_size: f64,
    half_window: i64,
    latitude_sum: f64,
    point_count: usize,
}

impl DensityAccumulator {
    /// Grid covering `range` with `tile_size` pixels per tile. Each point is
    /// spread over a window of `half_window` pixels on every side.
    pub fn new(range: &TileRange, tile_size: u32, half_window: u32) -> Self {
        let width = (range.cols() * tile_size) as usize;
        let height = (range.rows() * tile_size) as usize;
        Self {
            grid: DensityGrid::zeros(width, height),
            zoom: range.zoom,
            origin_x: range.x_min as f64,
            origin_y: range.y_min as f64,
            tile_size: tile_size as f64,
            half_window: half_window as i64,
            latitude_sum: 0.0,
            point_count: 0,
        }
    }

    /// Pixel (row, col) of a point relative to the grid origin. Halves round
    /// to even. May fall outside the grid.
    pub fn pixel_of(&self, point: &GpsPoint) -> (i64, i64) {
        let (x, y) = project(point.latitude, point.longitude, self.zoom);
        let row = ((y - self.origin_y) * self.tile_size).round_ties_even() as i64;
        let col = ((x - self.origin_x) * self.tile_size).round_ties_even() as i64;
        (row, col)
    }

    pub fn add_point(&mut self, point: &GpsPoint) {
        self.latitude_sum += point.latitude;
        self.point_count += 1;

        let (row, col) = self.pixel_of(point);
        let height = self.grid.height as i64;
        let width = self.grid.width as i64;

        let row_start = (row - self.half_window).max(0);
        let row_end = (row + self.half_window).min(height - 1);
        let col_start = (col - self.half_window).max(0);
        let col_end = (col + self.half_window).min(width - 1);

        for r in row_start..=row_end {
            let offset = r as usize * self.grid.width;
            for c in col_start..=col_end {
                self.grid.data[offset + c as usize] += 1.0;
            }
        }
    }

    pub fn point_count(&self) -> usize {
        self.point_count
    }

    /// Apply the per-pixel cap and hand over the grid.
    pub fn finish(mut self, activity_count: u32) -> DensityGrid {
        if self.point_count == 0 {
            debug!("[Density] No points, grid stays empty");
            return self.grid;
        }

        let mean_latitude = self.latitude_sum / self.point_count as f64;
        let cap = max_accumulation(mean_latitude, self.zoom, activity_count);
        self.grid.clamp_max(cap);

        info!(
            "[Density] {} points on {}x{} px, mean latitude {:.4}, cap {:.2} for {} activities",
            self.point_count, self.grid.width, self.grid.height, mean_latitude, cap, activity_count
        );

        self.grid
    }
}

/// Accumulate `points` over the pixel grid of `range`.
///
/// Points are expected to lie inside the rendered area already; window
/// cells outside the grid are dropped.
pub fn accumulate_density(
    points: &[GpsPoint],
    range: &TileRange,
    tile_size: u32,
    half_window: u32,
    activity_count: u32,
) -> DensityGrid {
    let mut accumulator = DensityAccumulator::new(range, tile_size, half_window);
    for point in points {
        accumulator.add_point(point);
    }
    accumulator.finish(activity_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::unproject;

    fn single_tile(zoom: u8, x: u32, y: u32) -> TileRange {
        TileRange { zoom, x_min: x, x_max: x, y_min: y, y_max: y }
    }

    fn tile_center(zoom: u8, x: u32, y: u32) -> GpsPoint {
        let (lat, lon) = unproject(x as f64 + 0.5, y as f64 + 0.5, zoom);
        GpsPoint::new(lat, lon)
    }

    #[test]
    fn test_empty_points_give_zero_grid() {
        let grid = accumulate_density(&[], &single_tile(10, 530, 340), 256, 1, 0);
        assert_eq!((grid.width(), grid.height()), (256, 256));
        assert!(grid.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_single_point_fills_window() {
        let range = single_tile(10, 530, 340);
        let grid = accumulate_density(&[tile_center(10, 530, 340)], &range, 256, 1, 1);

        for row in 126..=130 {
            for col in 126..=130 {
                let inside = (127..=129).contains(&row) && (127..=129).contains(&col);
                let expected = if inside { 1.0 } else { 0.0 };
                assert_eq!(grid.get(row, col), expected, "cell {},{}", row, col);
            }
        }
        assert_eq!(grid.values().iter().sum::<f64>(), 9.0);
    }

    #[test]
    fn test_window_is_clipped_at_grid_edge() {
        let range = single_tile(10, 530, 340);
        // North-west corner of the tile
        let (lat, lon) = unproject(530.0, 340.0, 10);
        let grid = accumulate_density(&[GpsPoint::new(lat, lon)], &range, 256, 2, 1);
        // Only the 3x3 quarter of the 5x5 window is inside
        assert_eq!(grid.values().iter().sum::<f64>(), 9.0);
        assert_eq!(grid.get(0, 0), 1.0);
        assert_eq!(grid.get(2, 2), 1.0);
    }

    #[test]
    fn test_repeated_points_are_capped() {
        let range = single_tile(10, 530, 340);
        let point = tile_center(10, 530, 340);
        let points = vec![point; 1000];
        let grid = accumulate_density(&points, &range, 256, 0, 1);

        let cap = max_accumulation(point.latitude, 10, 1);
        assert!(cap > 1.0 && cap < 1000.0);
        assert!((grid.get(128, 128) - cap).abs() < 1e-9);
        assert_eq!(grid.get(128, 129), 0.0);
    }

    #[test]
    fn test_cap_scales_with_activity_count() {
        let one = max_accumulation(50.0, 12, 1);
        let five = max_accumulation(50.0, 12, 5);
        assert!((five - 5.0 * one).abs() < 1e-9);
        // 156543.03 * cos(50°) / 4096 / 5
        assert!((one - 4.913).abs() < 1e-3, "cap {}", one);
    }

    #[test]
    fn test_pixel_rounds_half_to_even() {
        let range = single_tile(0, 0, 0);
        let accumulator = DensityAccumulator::new(&range, 256, 0);
        // Longitude giving x = 2.5 / 256 exactly
        let lon = 2.5 / 256.0 * 360.0 - 180.0;
        let (_, col) = accumulator.pixel_of(&GpsPoint::new(0.0, lon));
        assert_eq!(col, 2);
    }

    #[test]
    fn test_argmax_and_min_max() {
        let grid = DensityGrid::from_vec(3, 2, vec![0.0, 1.0, 4.0, 2.0, -1.0, 3.0]);
        assert_eq!(grid.argmax(), Some((0, 2)));
        assert_eq!(grid.min_max(), Some((-1.0, 4.0)));
    }
}
