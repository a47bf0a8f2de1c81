//! Spectral curvature of the reference DEM.
//!
//! The elevation grid is multiplied, in the 2D Fourier domain, by the
//! spatial-frequency magnitude raised to a configurable exponent
//! (default 0.9, close to the |f|^1 of an exact derivative). Invalid
//! pixels are filled by nearest-neighbour interpolation beforehand and
//! restored to nodata afterwards; optional mirror replication reduces
//! wrap-around edge artifacts.

use ndarray::Array2;
use rustfft::{num_complex::Complex, FftPlanner};

use demdiff_core::{Dem, Result};

use crate::interpolation::nearest_neighbour_fill;

use super::DemTransform;

/// `ref-curvature`: frequency-domain curvature filter on the primary DEM.
#[derive(Debug, Clone, Copy)]
pub struct RefCurvature {
    /// Exponent of the spatial-frequency magnitude, close to 1
    filter_intensity: f64,
    /// Mirror-replicate the grid x2 per axis before filtering
    replication: bool,
}

impl RefCurvature {
    /// The registry configuration: intensity 0.9, replication on
    pub const fn standard() -> Self {
        Self {
            filter_intensity: 0.9,
            replication: true,
        }
    }

    /// Custom filter configuration
    pub fn new(filter_intensity: f64, replication: bool) -> Self {
        Self {
            filter_intensity,
            replication,
        }
    }
}

impl Default for RefCurvature {
    fn default() -> Self {
        Self::standard()
    }
}

impl DemTransform for RefCurvature {
    fn name(&self) -> &'static str {
        "ref-curvature"
    }

    fn fig_title(&self) -> &'static str {
        "REF dem curvature"
    }

    fn colorbar_title(&self) -> &'static str {
        "Curvature"
    }

    fn colormap(&self) -> &'static str {
        "bwr"
    }

    fn compute(&self, primary: &Dem, _secondary: Option<&Dem>) -> Result<Dem> {
        let (high, wide) = primary.shape();
        let invalid = primary.valid_mask().mapv(|v| !v);

        let filled = nearest_neighbour_fill(primary.image(), &invalid);
        let data = if self.replication {
            mirror_replicate(&filled)
        } else {
            filled
        };

        let (rows, cols) = data.dim();
        let freq_rows = fft_freq(rows, std::f64::consts::PI);
        let freq_cols = fft_freq(cols, std::f64::consts::PI);

        let mut spectrum = data.mapv(|v| Complex::new(v, 0.0));
        fft_2d(&mut spectrum, false);

        for ((i, j), value) in spectrum.indexed_iter_mut() {
            let fy = freq_rows[i];
            let fx = freq_cols[j];
            *value *= (fx * fx + fy * fy).powf(self.filter_intensity / 2.0);
        }

        fft_2d(&mut spectrum, true);
        let scale = 1.0 / (rows * cols) as f64;

        // Real part only; the imaginary part is numerical noise.
        let mut filtered = Array2::<f64>::zeros((high, wide));
        for ((i, j), out) in filtered.indexed_iter_mut() {
            *out = spectrum[[i, j]].re * scale;
        }

        for ((i, j), &bad) in invalid.indexed_iter() {
            if bad {
                filtered[[i, j]] = primary.nodata();
            }
        }

        let mut out = primary.derived(filtered)?;
        out.set_classification(primary.classification().clone())?;
        Ok(out)
    }
}

/// Spatial frequencies in FFT-native ordering, spanning ±`edge`.
fn fft_freq(n: usize, edge: f64) -> Vec<f64> {
    (0..n)
        .map(|k| {
            let k = if k < n.div_ceil(2) {
                k as f64
            } else {
                k as f64 - n as f64
            };
            2.0 * edge * k / n as f64
        })
        .collect()
}

/// In-place 2D FFT (rows then columns), unnormalized.
fn fft_2d(data: &mut Array2<Complex<f64>>, inverse: bool) {
    let (rows, cols) = data.dim();
    let mut planner = FftPlanner::<f64>::new();
    let row_fft = if inverse {
        planner.plan_fft_inverse(cols)
    } else {
        planner.plan_fft_forward(cols)
    };
    let col_fft = if inverse {
        planner.plan_fft_inverse(rows)
    } else {
        planner.plan_fft_forward(rows)
    };

    let mut buf = vec![Complex::new(0.0, 0.0); cols.max(rows)];

    for r in 0..rows {
        for c in 0..cols {
            buf[c] = data[[r, c]];
        }
        row_fft.process(&mut buf[..cols]);
        for c in 0..cols {
            data[[r, c]] = buf[c];
        }
    }

    for c in 0..cols {
        for r in 0..rows {
            buf[r] = data[[r, c]];
        }
        col_fft.process(&mut buf[..rows]);
        for r in 0..rows {
            data[[r, c]] = buf[r];
        }
    }
}

/// Mirror the grid across both axes, doubling each dimension.
fn mirror_replicate(a: &Array2<f64>) -> Array2<f64> {
    let (rows, cols) = a.dim();
    let mut out = Array2::<f64>::zeros((2 * rows, 2 * cols));
    for ((i, j), &v) in a.indexed_iter() {
        out[[i, j]] = v;
        out[[i, 2 * cols - 1 - j]] = v;
        out[[2 * rows - 1 - i, j]] = v;
        out[[2 * rows - 1 - i, 2 * cols - 1 - j]] = v;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use demdiff_core::GeoTransform;

    fn dem(image: Array2<f64>) -> Dem {
        Dem::new(image, GeoTransform::default(), -9999.0)
    }

    #[test]
    fn test_fft_freq_layout() {
        let f = fft_freq(4, std::f64::consts::PI);
        assert_relative_eq!(f[0], 0.0);
        assert!(f[1] > 0.0);
        assert!(f[3] < 0.0);
        assert_relative_eq!(f[1], -f[3], epsilon = 1e-12);
    }

    #[test]
    fn test_constant_dem_has_zero_curvature() {
        // Only the DC bin is populated and its frequency magnitude is 0
        let out = RefCurvature::standard()
            .compute(&dem(Array2::from_elem((16, 16), 250.0)), None)
            .unwrap();
        for &v in out.image().iter() {
            assert_relative_eq!(v, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_pure_sine_is_eigenfunction() {
        // Without replication a single-frequency wave is scaled by
        // |f|^intensity exactly.
        let n = 32;
        let mode = 4.0;
        let image = Array2::from_shape_fn((n, n), |(_, j)| {
            (2.0 * std::f64::consts::PI * mode * j as f64 / n as f64).sin()
        });
        let out = RefCurvature::new(0.9, false)
            .compute(&dem(image.clone()), None)
            .unwrap();

        let freq = 2.0 * std::f64::consts::PI * mode / n as f64;
        let gain = freq.powf(0.9);
        for (o, &v) in out.image().iter().zip(image.iter()) {
            assert_relative_eq!(*o, gain * v, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_nodata_restored() {
        let mut image = Array2::from_shape_fn((8, 8), |(r, c)| (r + c) as f64);
        image[[3, 3]] = f64::NAN;
        let input = dem(image);

        let out = RefCurvature::standard().compute(&input, None).unwrap();
        assert_eq!(out.shape(), (8, 8));
        assert_eq!(out.image()[[3, 3]], -9999.0);
    }

    #[test]
    fn test_masks_carried_over() {
        use demdiff_core::Source;
        let mut input = dem(Array2::from_elem((4, 4), 1.0));
        input
            .attach_classification("status", Source::Ref, Array2::from_elem((4, 4), 2))
            .unwrap();

        let out = RefCurvature::standard().compute(&input, None).unwrap();
        assert!(out.classification_layer("status").is_some());
    }
}
