//! Heatmap rendering.
//!
//! The render pipeline, leaves first:
//!
//! ```text
//! points ──filter──> TileRange ──> Supertile (dark base map)
//!    └──> DensityGrid ──> box filter + normalize ──> ColorRamp ──┐
//!                                                    composite <─┘
//! ```
//!
//! Everything is sequential and owned by one call; the only slow step is
//! tile acquisition, which the [`TileProvider`] may parallelize internally.

use std::path::Path;
use std::time::Instant;

use image::{ImageBuffer, Rgb, Rgb32FImage};
use log::{debug, info};

use crate::colormap::ColorRamp;
use crate::config::HeatmapConfig;
use crate::density::{accumulate_density, DensityGrid};
use crate::error::HeatmapError;
use crate::geo_utils;
use crate::mosaic::{build_supertile, Supertile};
use crate::projection::TileRange;
use crate::smoothing::smooth_density;
use crate::tiles::TileProvider;
use crate::GpsPoint;

/// A rendered heatmap, channel values in [0, 1].
#[derive(Debug, Clone)]
pub struct HeatmapImage {
    image: Rgb32FImage,
    range: TileRange,
    point_count: usize,
}

impl HeatmapImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> [f32; 3] {
        self.image.get_pixel(x, y).0
    }

    /// Tiles the image covers.
    pub fn range(&self) -> &TileRange {
        &self.range
    }

    /// Points that fell inside the bounds and were drawn.
    pub fn point_count(&self) -> usize {
        self.point_count
    }

    pub fn image(&self) -> &Rgb32FImage {
        &self.image
    }

    pub fn into_image(self) -> Rgb32FImage {
        self.image
    }

    /// Quantize to 8-bit RGB.
    pub fn to_rgb8(&self) -> image::RgbImage {
        image::DynamicImage::ImageRgb32F(self.image.clone()).to_rgb8()
    }

    pub fn save_png(&self, path: &Path) -> Result<(), HeatmapError> {
        info!("[Heatmap] Saving {}", path.display());
        self.to_rgb8().save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }
}

/// Blend one colour over one base pixel:
/// `out = (1 - color) · base + color`, per channel.
///
/// Zero colour keeps the base, full colour replaces it.
#[inline]
pub fn composite(base: [f64; 3], color: [f64; 3]) -> [f64; 3] {
    [
        (1.0 - color[0]) * base[0] + color[0],
        (1.0 - color[1]) * base[1] + color[1],
        (1.0 - color[2]) * base[2] + color[2],
    ]
}

/// Map normalized density to colour. Cells that get the ramp's zero
/// colour become black, so the base map shows through untouched.
pub fn colorize(density: &DensityGrid, ramp: ColorRamp) -> Rgb32FImage {
    let zero = ramp.zero_color();
    let mut layer: Rgb32FImage = ImageBuffer::new(density.width() as u32, density.height() as u32);
    for (pixel, &value) in layer.pixels_mut().zip(density.values()) {
        let color = ramp.rgb(value);
        if color != zero {
            *pixel = Rgb([color[0] as f32, color[1] as f32, color[2] as f32]);
        }
    }
    layer
}

/// Composite a colour layer over the base map. Both must be the same size.
pub fn composite_layer(base: &Supertile, layer: &Rgb32FImage) -> Rgb32FImage {
    debug_assert_eq!((base.width(), base.height()), layer.dimensions());
    let mut out: Rgb32FImage = ImageBuffer::new(base.width(), base.height());
    for ((pixel, under), over) in out.pixels_mut().zip(base.image().pixels()).zip(layer.pixels()) {
        let blended = composite(widen(under.0), widen(over.0));
        *pixel = Rgb([blended[0] as f32, blended[1] as f32, blended[2] as f32]);
    }
    out
}

#[inline]
fn widen(c: [f32; 3]) -> [f64; 3] {
    [c[0] as f64, c[1] as f64, c[2] as f64]
}

/// Tile rectangle the render covers: the configured bounds in equal-extent
/// mode, otherwise the extent of the points. An empty point set frames the
/// single tile containing the centre of the configured bounds.
pub fn frame(points: &[GpsPoint], config: &HeatmapConfig) -> Result<TileRange, HeatmapError> {
    let extent = if config.equal_extent {
        config.bounds
    } else {
        match geo_utils::compute_bounds(points) {
            Some(extent) => extent,
            None => {
                let center = config.bounds.center();
                return TileRange::containing(center.latitude, center.longitude, config.zoom);
            }
        }
    };
    TileRange::covering(
        extent.min_lat,
        extent.max_lat,
        extent.min_lng,
        extent.max_lng,
        config.zoom,
    )
}

/// Render a heatmap of `points` over map tiles.
///
/// Points outside `config.bounds` are dropped first. `activity_count` is the
/// number of activities the points came from and scales the per-pixel cap.
/// An empty point set yields the bare base map rather than an error.
///
/// # Errors
///
/// Invalid configuration, an unprojectable frame (e.g. equal-extent bounds
/// reaching a pole), or a frame needing more than `config.max_tile_count`
/// tiles. In the last case no tile is requested.
pub fn render_heatmap<P: TileProvider + ?Sized>(
    points: &[GpsPoint],
    activity_count: u32,
    config: &HeatmapConfig,
    provider: &P,
) -> Result<HeatmapImage, HeatmapError> {
    config.validate()?;
    let start = Instant::now();

    let inside = geo_utils::filter_to_bounds(points, &config.bounds);
    info!(
        "[Heatmap] Rendering {} of {} points from {} activities at zoom {}",
        inside.len(),
        points.len(),
        activity_count,
        config.zoom
    );

    let range = frame(&inside, config)?;
    let supertile = build_supertile(&range, config.tile_size, config.max_tile_count, provider)?;

    let raw = accumulate_density(
        &inside,
        &range,
        config.tile_size,
        config.sigma_pixels,
        activity_count,
    );
    let density = smooth_density(&raw, config.sigma_pixels);
    debug!("[Heatmap] Density ready after {:?}", start.elapsed());

    let layer = colorize(&density, config.color_ramp);
    let image = composite_layer(&supertile, &layer);

    info!(
        "[Heatmap] Rendered {}x{} px in {:?}",
        image.width(),
        image.height(),
        start.elapsed()
    );

    Ok(HeatmapImage {
        image,
        range,
        point_count: inside.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::density::max_accumulation;
    use crate::error::TileError;
    use crate::projection::{project, unproject, TileCoord};
    use crate::tiles::{PlaceholderTiles, TileImage};
    use crate::Bounds;
    use std::cell::Cell;

    struct GrayTiles {
        calls: Cell<usize>,
    }

    impl TileProvider for GrayTiles {
        fn tile(&self, _coord: TileCoord) -> Result<TileImage, TileError> {
            self.calls.set(self.calls.get() + 1);
            Ok(TileImage::filled(256, 0.5))
        }
    }

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn tile_center(zoom: u8, x: u32, y: u32) -> GpsPoint {
        let (lat, lon) = unproject(x as f64 + 0.5, y as f64 + 0.5, zoom);
        GpsPoint::new(lat, lon)
    }

    #[test]
    fn test_composite_identities() {
        let base = [0.2, 0.7, 0.9];
        assert_eq!(composite(base, [0.0, 0.0, 0.0]), base);
        assert_eq!(composite(base, [1.0, 1.0, 1.0]), [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_composite_mixes_per_channel() {
        let out = composite([0.5, 0.5, 0.5], [1.0, 0.5, 0.0]);
        assert_eq!(out, [1.0, 0.75, 0.5]);
    }

    #[test]
    fn test_colorize_blacks_out_zero_bin() {
        let density = DensityGrid::from_vec(3, 1, vec![0.0, 1e-9, 1.0]);
        let layer = colorize(&density, ColorRamp::Hot);
        assert_eq!(layer.get_pixel(0, 0).0, [0.0, 0.0, 0.0]);
        assert_eq!(layer.get_pixel(1, 0).0, [0.0, 0.0, 0.0]);
        assert_eq!(layer.get_pixel(2, 0).0, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_single_point_end_to_end() {
        let (zoom, tx, ty) = (10, 530, 340);
        let point = tile_center(zoom, tx, ty);
        let config = HeatmapConfig::default().with_zoom(zoom).with_sigma(1);

        // Raw grid: a 3x3 block of ones at the projected pixel, no clamping
        let range = frame(&[point], &config).unwrap();
        assert_eq!((range.x_min, range.y_min, range.tile_count()), (tx, ty, 1));
        let (x, y) = project(point.latitude, point.longitude, zoom);
        let row = ((y - ty as f64) * 256.0).round() as usize;
        let col = ((x - tx as f64) * 256.0).round() as usize;
        assert_eq!((row, col), (128, 128));

        let raw = accumulate_density(&[point], &range, 256, 1, 1);
        assert!(max_accumulation(point.latitude, zoom, 1) >= 1.0);
        for r in row - 1..=row + 1 {
            for c in col - 1..=col + 1 {
                assert_eq!(raw.get(r, c), 1.0);
            }
        }
        assert_eq!(raw.values().iter().sum::<f64>(), 9.0);

        // Smoothed peak is the maximum and normalizes to exactly 1
        let density = smooth_density(&raw, 1);
        let (peak_row, peak_col) = density.argmax().unwrap();
        assert_eq!(density.get(peak_row, peak_col), 1.0);

        // Composite shows the ramp's full colour at the peak
        let image = render_heatmap(&[point], 1, &config, &PlaceholderTiles).unwrap();
        assert_eq!((image.width(), image.height()), (256, 256));
        let full = ColorRamp::Hot.rgb(1.0);
        let peak = image.pixel(peak_col as u32, peak_row as u32);
        for ch in 0..3 {
            assert!(approx_eq(peak[ch] as f64, full[ch], 1e-6));
        }
        assert_eq!(image.point_count(), 1);
    }

    #[test]
    fn test_background_keeps_base_map() {
        let point = tile_center(12, 2120, 1370);
        let config = HeatmapConfig::default().with_zoom(12);
        let provider = GrayTiles { calls: Cell::new(0) };
        let image = render_heatmap(&[point], 1, &config, &provider).unwrap();

        // 0.5 gray inverts to 0.5, far corner has no density
        let [r, g, b] = image.pixel(5, 250);
        assert!(approx_eq(r as f64, 0.5, 1e-6));
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert_eq!(provider.calls.get(), 1);
    }

    #[test]
    fn test_empty_points_render_base_map_in_bounds() {
        let bounds = Bounds::new(50.70, 50.80, 6.00, 6.15);
        let config = HeatmapConfig::default().with_zoom(12).with_bounds(bounds);
        let image = render_heatmap(&[], 0, &config, &PlaceholderTiles).unwrap();

        let center = bounds.center();
        let expected = TileRange::containing(center.latitude, center.longitude, 12).unwrap();
        assert_eq!(*image.range(), expected);
        assert!(image.image().pixels().all(|p| p.0.iter().all(|&v| v.abs() < 1e-6)));
    }

    #[test]
    fn test_empty_points_with_default_config() {
        let image = render_heatmap(&[], 0, &HeatmapConfig::default(), &PlaceholderTiles).unwrap();
        assert_eq!(image.range().tile_count(), 1);
        assert_eq!(image.point_count(), 0);
    }

    #[test]
    fn test_points_outside_bounds_are_dropped() {
        let bounds = Bounds::new(50.0, 51.0, 6.0, 7.0);
        let config = HeatmapConfig::default().with_zoom(8).with_bounds(bounds);
        let points = [GpsPoint::new(50.5, 6.5), GpsPoint::new(52.5, 6.5)];
        let image = render_heatmap(&points, 1, &config, &PlaceholderTiles).unwrap();
        assert_eq!(image.point_count(), 1);
        assert_eq!(image.range().tile_count(), 1);
    }

    #[test]
    fn test_equal_extent_frames_by_bounds() {
        let bounds = Bounds::new(50.0, 51.0, 6.0, 7.0);
        let config = HeatmapConfig::default()
            .with_zoom(10)
            .with_bounds(bounds)
            .with_equal_extent(true);
        let image = render_heatmap(&[GpsPoint::new(50.5, 6.5)], 1, &config, &PlaceholderTiles).unwrap();
        assert_eq!(*image.range(), TileRange::covering(50.0, 51.0, 6.0, 7.0, 10).unwrap());
        assert!(image.range().tile_count() > 1);
    }

    #[test]
    fn test_equal_extent_to_pole_is_rejected() {
        let config = HeatmapConfig::default().with_equal_extent(true);
        let result = render_heatmap(&[GpsPoint::new(50.5, 6.5)], 1, &config, &PlaceholderTiles);
        assert!(matches!(result, Err(HeatmapError::InvalidLatitude(_))));
    }

    #[test]
    fn test_too_many_tiles_fails_before_fetching() {
        let config = HeatmapConfig::default()
            .with_zoom(16)
            .with_bounds(Bounds::new(50.0, 51.0, 6.0, 7.0))
            .with_equal_extent(true);
        let provider = GrayTiles { calls: Cell::new(0) };
        let result = render_heatmap(&[GpsPoint::new(50.5, 6.5)], 1, &config, &provider);
        assert!(matches!(result, Err(HeatmapError::TooManyTiles { max: 500, .. })));
        assert_eq!(provider.calls.get(), 0);
    }
}
