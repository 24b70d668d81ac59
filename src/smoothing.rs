//! Smoothing Filter.
//!
//! Kernel density estimate by a single box convolution whose width matches
//! the variance of a Gaussian with standard deviation `sigma`:
//!
//! ```text
//! k = floor(sqrt(12 · sigma² + 1))
//! ```
//!
//! (Kovesi, "Fast Almost-Gaussian Filtering"). The box is applied once, not
//! three times.
//!
//! The convolution runs in the frequency domain and is circular: the `k×k`
//! kernel sits at the grid origin, so mass spreads towards increasing row
//! and column indices and wraps around the far edges. The result is then
//! rescaled to [0, 1] by its own minimum and maximum.

use std::time::Instant;

use log::debug;
use rustfft::num_complex::Complex;
use rustfft::{FftDirection, FftPlanner};

use crate::density::DensityGrid;

/// Box width approximating a Gaussian of standard deviation `sigma` pixels.
pub fn kernel_width(sigma: u32) -> usize {
    let sigma = sigma as f64;
    (12.0 * sigma * sigma + 1.0).sqrt().floor() as usize
}

/// Circular convolution of `grid` with a normalized `k×k` box anchored at
/// the origin. Kernels larger than the grid are cropped to it.
pub fn box_filter(grid: &DensityGrid, k: usize) -> DensityGrid {
    let rows = grid.height();
    let cols = grid.width();
    if rows == 0 || cols == 0 || k == 0 {
        return grid.clone();
    }

    let start = Instant::now();
    let mut planner = FftPlanner::new();

    let mut image: Vec<Complex<f64>> = grid.values().iter().map(|&v| Complex::new(v, 0.0)).collect();
    fft2(&mut planner, &mut image, rows, cols, FftDirection::Forward);

    let weight = 1.0 / (k * k) as f64;
    let mut kernel = vec![Complex::new(0.0, 0.0); rows * cols];
    for r in 0..k.min(rows) {
        for c in 0..k.min(cols) {
            kernel[r * cols + c] = Complex::new(weight, 0.0);
        }
    }
    fft2(&mut planner, &mut kernel, rows, cols, FftDirection::Forward);

    for (a, b) in image.iter_mut().zip(kernel.iter()) {
        *a = *a * *b;
    }
    fft2(&mut planner, &mut image, rows, cols, FftDirection::Inverse);

    let scale = 1.0 / (rows * cols) as f64;
    let data = image.into_iter().map(|c| c.re * scale).collect();

    debug!("[Smoothing] {}x{} box filter on {}x{} grid in {:?}", k, k, cols, rows, start.elapsed());
    DensityGrid::from_vec(cols, rows, data)
}

/// Linear rescale to [0, 1] by min and max. A constant grid, including the
/// all-zero grid of an empty render, maps to all zeros.
pub fn normalize(grid: &DensityGrid) -> DensityGrid {
    let (min, max) = match grid.min_max() {
        Some(range) => range,
        None => return grid.clone(),
    };

    if max == min || !(max - min).is_finite() {
        return DensityGrid::zeros(grid.width(), grid.height());
    }

    let span = max - min;
    let data = grid.values().iter().map(|&v| (v - min) / span).collect();
    DensityGrid::from_vec(grid.width(), grid.height(), data)
}

/// Box-filter with the width for `sigma`, then normalize.
pub fn smooth_density(grid: &DensityGrid, sigma: u32) -> DensityGrid {
    normalize(&box_filter(grid, kernel_width(sigma)))
}

/// In-place 2-D FFT of a row-major `rows×cols` buffer, unnormalized.
fn fft2(
    planner: &mut FftPlanner<f64>,
    buffer: &mut Vec<Complex<f64>>,
    rows: usize,
    cols: usize,
    direction: FftDirection,
) {
    // rustfft transforms every `cols`-long chunk, i.e. every row
    planner.plan_fft(cols, direction).process(buffer);

    let mut columns = transpose(buffer, rows, cols);
    planner.plan_fft(rows, direction).process(&mut columns);
    *buffer = transpose(&columns, cols, rows);
}

fn transpose(src: &[Complex<f64>], rows: usize, cols: usize) -> Vec<Complex<f64>> {
    let mut out = vec![Complex::new(0.0, 0.0); rows * cols];
    for r in 0..rows {
        for c in 0..cols {
            out[c * rows + r] = src[r * cols + c];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn impulse(width: usize, height: usize, row: usize, col: usize) -> DensityGrid {
        let mut grid = DensityGrid::zeros(width, height);
        grid.set(row, col, 1.0);
        grid
    }

    #[test]
    fn test_kernel_width() {
        assert_eq!(kernel_width(1), 3);
        assert_eq!(kernel_width(2), 7);
        assert_eq!(kernel_width(3), 10);
        assert_eq!(kernel_width(5), 17);
    }

    #[test]
    fn test_box_filter_spreads_impulse_forward() {
        let filtered = box_filter(&impulse(12, 10, 4, 5), 3);
        for row in 0..10 {
            for col in 0..12 {
                let inside = (4..=6).contains(&row) && (5..=7).contains(&col);
                let expected = if inside { 1.0 / 9.0 } else { 0.0 };
                assert!(
                    approx_eq(filtered.get(row, col), expected, 1e-12),
                    "cell {},{} = {}",
                    row,
                    col,
                    filtered.get(row, col)
                );
            }
        }
    }

    #[test]
    fn test_box_filter_wraps_around() {
        let filtered = box_filter(&impulse(8, 6, 5, 7), 3);
        // Rows 5,0,1 and columns 7,0,1
        assert!(approx_eq(filtered.get(0, 0), 1.0 / 9.0, 1e-12));
        assert!(approx_eq(filtered.get(1, 1), 1.0 / 9.0, 1e-12));
        assert!(approx_eq(filtered.get(5, 7), 1.0 / 9.0, 1e-12));
        assert!(approx_eq(filtered.get(3, 3), 0.0, 1e-12));
    }

    #[test]
    fn test_box_filter_preserves_mass() {
        let mut grid = DensityGrid::zeros(16, 9);
        grid.set(2, 3, 4.0);
        grid.set(7, 12, 2.5);
        grid.set(8, 15, 1.0);
        let filtered = box_filter(&grid, 7);
        let total: f64 = filtered.values().iter().sum();
        assert!(approx_eq(total, 7.5, 1e-9));
    }

    #[test]
    fn test_normalize_hits_both_ends() {
        let grid = DensityGrid::from_vec(3, 2, vec![2.0, 4.0, 3.0, 6.0, 2.5, 5.0]);
        let normalized = normalize(&grid);
        assert_eq!(normalized.min_max(), Some((0.0, 1.0)));
        assert!(normalized.values().iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert!(approx_eq(normalized.get(0, 2), 0.25, 1e-12));
    }

    #[test]
    fn test_normalize_degenerate_grid_is_zero() {
        let zero = DensityGrid::zeros(5, 4);
        assert_eq!(normalize(&zero), zero);

        let constant = DensityGrid::from_vec(2, 2, vec![3.0; 4]);
        assert_eq!(normalize(&constant), DensityGrid::zeros(2, 2));
    }

    #[test]
    fn test_smooth_empty_grid_is_zero() {
        let smoothed = smooth_density(&DensityGrid::zeros(32, 32), 2);
        assert!(smoothed.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_smooth_block_peaks_at_full_overlap() {
        let mut grid = DensityGrid::zeros(20, 20);
        for row in 9..=11 {
            for col in 9..=11 {
                grid.set(row, col, 1.0);
            }
        }
        let smoothed = smooth_density(&grid, 1);
        // The 3x3 box covers the whole block only at the block's far corner
        assert_eq!(smoothed.argmax(), Some((11, 11)));
        assert_eq!(smoothed.get(11, 11), 1.0);
        assert_eq!(smoothed.min_max().map(|(lo, _)| lo), Some(0.0));
    }
}
