//! Render configuration.

use crate::colormap::ColorRamp;
use crate::error::HeatmapError;
use crate::projection::MAX_ZOOM;
use crate::Bounds;

/// Default tile server, the Wikimedia OSM rendering.
pub const DEFAULT_TILE_URL: &str = "https://maps.wikimedia.org/osm-intl";

/// Configuration for heatmap rendering.
///
/// Passed by reference into [`render_heatmap`](crate::render_heatmap) and
/// never mutated by it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HeatmapConfig {
    /// Tile zoom level (0-19). Sets both resolution and tile count.
    /// Default: 10
    pub zoom: u8,

    /// Gaussian sigma in pixels. Also the half-width of the window each
    /// trackpoint is spread over.
    /// Default: 1
    pub sigma_pixels: u32,

    /// Points outside this box are dropped before rendering.
    /// Default: the whole world
    pub bounds: Bounds,

    /// Frame the image by `bounds` instead of by the data, so a series of
    /// renders shares one extent.
    /// Default: false
    pub equal_extent: bool,

    /// Edge length of a map tile in pixels.
    /// Default: 256
    pub tile_size: u32,

    /// Largest tile rectangle a render may request.
    /// Default: 500
    pub max_tile_count: usize,

    /// Colour ramp applied to normalized density.
    /// Default: hot
    pub color_ramp: ColorRamp,

    /// Tile server base URL, tiles are `{base}/{zoom}/{x}/{y}.png`.
    pub tile_base_url: String,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            zoom: 10,
            sigma_pixels: 1,
            bounds: Bounds::world(),
            equal_extent: false,
            tile_size: 256,
            max_tile_count: 500,
            color_ramp: ColorRamp::Hot,
            tile_base_url: DEFAULT_TILE_URL.to_string(),
        }
    }
}

impl HeatmapConfig {
    pub fn with_zoom(mut self, zoom: u8) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn with_sigma(mut self, sigma_pixels: u32) -> Self {
        self.sigma_pixels = sigma_pixels;
        self
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_equal_extent(mut self, equal_extent: bool) -> Self {
        self.equal_extent = equal_extent;
        self
    }

    pub fn with_max_tile_count(mut self, max_tile_count: usize) -> Self {
        self.max_tile_count = max_tile_count;
        self
    }

    pub fn with_color_ramp(mut self, color_ramp: ColorRamp) -> Self {
        self.color_ramp = color_ramp;
        self
    }

    pub fn with_tile_base_url(mut self, url: impl Into<String>) -> Self {
        self.tile_base_url = url.into();
        self
    }

    /// Check the parameters that do not depend on the point data.
    pub fn validate(&self) -> Result<(), HeatmapError> {
        if self.zoom > MAX_ZOOM {
            return Err(HeatmapError::InvalidZoom(self.zoom));
        }
        if self.sigma_pixels == 0 {
            return Err(HeatmapError::InvalidSigma);
        }
        if self.tile_size == 0 {
            return Err(HeatmapError::InvalidTileSize);
        }
        let b = &self.bounds;
        if !(b.min_lat < b.max_lat && b.min_lng < b.max_lng) {
            return Err(HeatmapError::InvalidBounds {
                lat_min: b.min_lat,
                lat_max: b.max_lat,
                lon_min: b.min_lng,
                lon_max: b.max_lng,
            });
        }
        Ok(())
    }

    /// Load a configuration from JSON. Missing fields take their defaults.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, HeatmapError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HeatmapConfig::default();
        assert_eq!(config.zoom, 10);
        assert_eq!(config.sigma_pixels, 1);
        assert_eq!(config.tile_size, 256);
        assert_eq!(config.max_tile_count, 500);
        assert_eq!(config.color_ramp, ColorRamp::Hot);
        assert_eq!(config.tile_base_url, "https://maps.wikimedia.org/osm-intl");
        assert!(!config.equal_extent);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let too_deep = HeatmapConfig::default().with_zoom(20);
        assert!(matches!(too_deep.validate(), Err(HeatmapError::InvalidZoom(20))));

        let no_sigma = HeatmapConfig::default().with_sigma(0);
        assert!(matches!(no_sigma.validate(), Err(HeatmapError::InvalidSigma)));

        let flipped = HeatmapConfig::default().with_bounds(Bounds::new(51.0, 50.0, 6.0, 7.0));
        assert!(matches!(flipped.validate(), Err(HeatmapError::InvalidBounds { .. })));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_from_json_fills_defaults() {
        let config = HeatmapConfig::from_json(r#"{"zoom": 12, "color_ramp": "jet"}"#).unwrap();
        assert_eq!(config.zoom, 12);
        assert_eq!(config.color_ramp, ColorRamp::Jet);
        assert_eq!(config.max_tile_count, 500);
    }
}
