//! Colour ramps for normalized density.
//!
//! Each ramp is defined by piecewise-linear control points per channel and
//! sampled into [`LUT_SIZE`] bins. A density `v` in [0, 1] picks bin
//! `min(floor(v * LUT_SIZE), LUT_SIZE - 1)`, so tiny non-zero densities
//! still land in the zero bin and get the zero colour.

use std::fmt;
use std::str::FromStr;

/// Number of discrete colours in a ramp.
pub const LUT_SIZE: usize = 256;

/// (position, value) control points for one channel.
type Channel = &'static [(f64, f64)];

const HOT: [Channel; 3] = [
    &[(0.0, 0.0416), (0.365079, 1.0), (1.0, 1.0)],
    &[(0.0, 0.0), (0.365079, 0.0), (0.746032, 1.0), (1.0, 1.0)],
    &[(0.0, 0.0), (0.746032, 0.0), (1.0, 1.0)],
];

const JET: [Channel; 3] = [
    &[(0.0, 0.0), (0.35, 0.0), (0.66, 1.0), (0.89, 1.0), (1.0, 0.5)],
    &[(0.0, 0.0), (0.125, 0.0), (0.375, 1.0), (0.64, 1.0), (0.91, 0.0), (1.0, 0.0)],
    &[(0.0, 0.5), (0.11, 1.0), (0.34, 1.0), (0.65, 0.0), (1.0, 0.0)],
];

const GRAY: [Channel; 3] = [
    &[(0.0, 0.0), (1.0, 1.0)],
    &[(0.0, 0.0), (1.0, 1.0)],
    &[(0.0, 0.0), (1.0, 1.0)],
];

/// Available colour ramps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ColorRamp {
    /// Black -> Red -> Yellow -> White
    #[default]
    Hot,
    /// Blue -> Cyan -> Green -> Yellow -> Red
    Jet,
    /// Black -> White
    Gray,
}

impl ColorRamp {
    fn channels(&self) -> &'static [Channel; 3] {
        match self {
            ColorRamp::Hot => &HOT,
            ColorRamp::Jet => &JET,
            ColorRamp::Gray => &GRAY,
        }
    }

    /// Map a normalized density to RGBA. Ramps are opaque, alpha is always 1.
    pub fn rgba(&self, value: f64) -> [f64; 4] {
        let [r, g, b] = self.rgb(value);
        [r, g, b, 1.0]
    }

    pub fn rgb(&self, value: f64) -> [f64; 3] {
        let position = bin(value) as f64 / (LUT_SIZE - 1) as f64;
        let [r, g, b] = self.channels();
        [
            interpolate(r, position),
            interpolate(g, position),
            interpolate(b, position),
        ]
    }

    /// Colour of the lowest bin.
    pub fn zero_color(&self) -> [f64; 3] {
        self.rgb(0.0)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ColorRamp::Hot => "hot",
            ColorRamp::Jet => "jet",
            ColorRamp::Gray => "gray",
        }
    }
}

/// Lookup bin for a density. NaN and negatives fall into the first bin.
#[inline]
fn bin(value: f64) -> usize {
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    ((value * LUT_SIZE as f64) as usize).min(LUT_SIZE - 1)
}

fn interpolate(points: Channel, x: f64) -> f64 {
    let upper = points.iter().position(|&(px, _)| px >= x).unwrap_or(points.len() - 1);
    if upper == 0 {
        return points[0].1;
    }
    let (x0, y0) = points[upper - 1];
    let (x1, y1) = points[upper];
    let t = (x - x0) / (x1 - x0);
    (y0 + t * (y1 - y0)).clamp(0.0, 1.0)
}

impl fmt::Display for ColorRamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColorRamp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hot" => Ok(ColorRamp::Hot),
            "jet" => Ok(ColorRamp::Jet),
            "gray" | "grey" => Ok(ColorRamp::Gray),
            other => Err(format!("unknown colour ramp '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_hot_endpoints() {
        assert_eq!(ColorRamp::Hot.rgb(1.0), [1.0, 1.0, 1.0]);
        let zero = ColorRamp::Hot.zero_color();
        assert!(approx_eq(zero[0], 0.0416, 1e-12));
        assert_eq!(zero[1], 0.0);
        assert_eq!(zero[2], 0.0);
    }

    #[test]
    fn test_small_values_share_zero_bin() {
        let ramp = ColorRamp::Hot;
        assert_eq!(ramp.rgb(1e-15), ramp.zero_color());
        assert_eq!(ramp.rgb(0.999 / 256.0), ramp.zero_color());
        assert_ne!(ramp.rgb(1.0 / 256.0), ramp.zero_color());
        assert_eq!(ramp.rgb(-0.1), ramp.zero_color());
    }

    #[test]
    fn test_hot_is_monotonic() {
        let mut previous = [0.0; 3];
        for i in 0..=100 {
            let c = ColorRamp::Hot.rgb(i as f64 / 100.0);
            for ch in 0..3 {
                assert!(c[ch] >= previous[ch] - 1e-12);
            }
            previous = c;
        }
    }

    #[test]
    fn test_hot_midpoint_is_reddish_orange() {
        // Bin 128 -> position 128/255, red saturated, green ramping, no blue
        let c = ColorRamp::Hot.rgb(0.5);
        assert_eq!(c[0], 1.0);
        assert!(c[1] > 0.3 && c[1] < 0.4, "green {}", c[1]);
        assert_eq!(c[2], 0.0);
    }

    #[test]
    fn test_jet_endpoints() {
        assert_eq!(ColorRamp::Jet.rgb(0.0), [0.0, 0.0, 0.5]);
        assert_eq!(ColorRamp::Jet.rgb(1.0), [0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_rgba_alpha_is_opaque() {
        assert_eq!(ColorRamp::Gray.rgba(0.25)[3], 1.0);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("HOT".parse::<ColorRamp>().unwrap(), ColorRamp::Hot);
        assert_eq!("grey".parse::<ColorRamp>().unwrap(), ColorRamp::Gray);
        assert!("viridis".parse::<ColorRamp>().is_err());
        assert_eq!(ColorRamp::Jet.to_string(), "jet");
    }
}
