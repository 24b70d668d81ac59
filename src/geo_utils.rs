//! # Geographic Utilities
//!
//! Point-cloud helpers used before and during density accumulation.
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`filter_to_bounds`] | Keep points strictly inside a bounding box |
//! | [`compute_bounds`] | Bounding box of a point cloud |
//! | [`ground_resolution`] | Meters per pixel at a latitude and zoom |
//!
//! ## Example
//!
//! ```rust
//! use activity_heatmap::{Bounds, GpsPoint, geo_utils};
//!
//! let points = vec![
//!     GpsPoint::new(51.5000, -0.1300),
//!     GpsPoint::new(51.5100, -0.1200),
//!     GpsPoint::new(48.8566, 2.3522), // Paris, outside the box
//! ];
//!
//! let london = Bounds::new(51.0, 52.0, -1.0, 1.0);
//! let inside = geo_utils::filter_to_bounds(&points, &london);
//! assert_eq!(inside.len(), 2);
//!
//! let bounds = geo_utils::compute_bounds(&inside).unwrap();
//! assert_eq!(bounds.min_lat, 51.5000);
//! ```
//!
//! ## Ground resolution
//!
//! A 256 pixel tile at zoom 0 spans the equator, 40,075,016.686 m, giving
//! 156,543.03 m/pixel. Each zoom level halves that and the Mercator scale
//! shrinks it by `cos(latitude)` away from the equator.

use geo::{BoundingRect, MultiPoint, Point};

use crate::{Bounds, GpsPoint};

/// Meters per pixel at the equator at zoom 0 for 256 pixel tiles.
pub const EQUATOR_METERS_PER_PIXEL: f64 = 156_543.03;

fn to_multi_point(points: &[GpsPoint]) -> MultiPoint<f64> {
    points
        .iter()
        .map(|p| Point::new(p.longitude, p.latitude))
        .collect::<Vec<_>>()
        .into()
}

/// Keep the points lying strictly inside `bounds`, preserving order.
pub fn filter_to_bounds(points: &[GpsPoint], bounds: &Bounds) -> Vec<GpsPoint> {
    points.iter().filter(|p| bounds.contains(p)).copied().collect()
}

/// Bounding box of a point cloud, `None` when empty.
pub fn compute_bounds(points: &[GpsPoint]) -> Option<Bounds> {
    let rect = to_multi_point(points).bounding_rect()?;
    Some(Bounds {
        min_lat: rect.min().y,
        max_lat: rect.max().y,
        min_lng: rect.min().x,
        max_lng: rect.max().x,
    })
}

/// Physical size of one map pixel in meters.
#[inline]
pub fn ground_resolution(latitude: f64, zoom: u8) -> f64 {
    EQUATOR_METERS_PER_PIXEL * latitude.to_radians().cos() / 2f64.powi(zoom as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_filter_to_bounds_is_strict() {
        let bounds = Bounds::new(50.0, 51.0, 6.0, 7.0);
        let points = vec![
            GpsPoint::new(50.5, 6.5),
            GpsPoint::new(50.0, 6.5),
            GpsPoint::new(50.5, 7.0),
            GpsPoint::new(50.9, 6.1),
        ];
        let inside = filter_to_bounds(&points, &bounds);
        assert_eq!(inside, vec![GpsPoint::new(50.5, 6.5), GpsPoint::new(50.9, 6.1)]);
    }

    #[test]
    fn test_compute_bounds() {
        let track = vec![
            GpsPoint::new(51.50, -0.13),
            GpsPoint::new(51.51, -0.12),
            GpsPoint::new(51.505, -0.125),
        ];
        let bounds = compute_bounds(&track).unwrap();
        assert_eq!(bounds.min_lat, 51.50);
        assert_eq!(bounds.max_lat, 51.51);
        assert_eq!(bounds.min_lng, -0.13);
        assert_eq!(bounds.max_lng, -0.12);
    }

    #[test]
    fn test_compute_bounds_empty() {
        assert!(compute_bounds(&[]).is_none());
    }

    #[test]
    fn test_ground_resolution() {
        assert!(approx_eq(ground_resolution(0.0, 0), 156_543.03, 1e-6));
        assert!(approx_eq(ground_resolution(0.0, 10), 152.8740527, 1e-6));
        // Halved at 60 degrees
        assert!(approx_eq(ground_resolution(60.0, 10), 152.8740527 / 2.0, 1e-6));
    }
}
