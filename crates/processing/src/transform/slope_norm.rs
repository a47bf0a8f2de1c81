//! Altitude difference normalized by the secondary DEM's slope.
//!
//! The dispersion of elevation errors grows with terrain slope. This
//! strategy buckets pixels by slope angle, measures the per-bucket
//! standard deviation of the raw difference, fits
//! `std = a * tan(angle) + b` by least squares and rescales the
//! bias-corrected difference by `1 / (1 + (b/a) * tan(angle))`.

use ndarray::{Array2, Zip};
use tracing::{debug, error};

use demdiff_core::{Dem, Error, Result, Source};

use crate::terrain::{slope, SlopeUnits};

use super::{check_aligned, elevation_difference, merge_attachments, require_secondary, DemTransform};

/// Number of slope-angle histogram bins
const NBINS: usize = 100;

/// `alti-diff-slope-norm`: slope-normalized elevation difference.
#[derive(Debug, Clone, Copy, Default)]
pub struct AltiDiffSlopeNorm;

impl DemTransform for AltiDiffSlopeNorm {
    fn name(&self) -> &'static str {
        "alti-diff-slope-norm"
    }

    fn fig_title(&self) -> &'static str {
        "[REF - SEC] difference normalized by the slope"
    }

    fn colorbar_title(&self) -> &'static str {
        "Elevation difference normalized by the slope"
    }

    fn colormap(&self) -> &'static str {
        "bwr"
    }

    fn compute(&self, primary: &Dem, secondary: Option<&Dem>) -> Result<Dem> {
        let secondary = require_secondary(self.name(), secondary)?;
        check_aligned(self.name(), primary, secondary)?;

        let diff = elevation_difference(primary, secondary);

        // Slope angle of the secondary DEM in radians; reuse an attached
        // degree-slope grid when the pipeline already computed one.
        let alpha = match secondary.slopes().get(Source::Sec) {
            Some(degrees) => degrees.mapv(f64::to_radians),
            None => slope(secondary, SlopeUnits::Radians),
        };

        let normalized = normalize_by_slope(&diff, &alpha)?;

        let mut out = secondary.derived(normalized)?;
        out.set_nodata(primary.nodata());
        merge_attachments(&mut out, primary, secondary)?;
        Ok(out)
    }
}

/// Subtract the global mean bias from `diff` and scale it by the
/// per-pixel slope normalization factor.
fn normalize_by_slope(diff: &Array2<f64>, alpha: &Array2<f64>) -> Result<Array2<f64>> {
    let tan_alpha = alpha.mapv(f64::tan);

    let mut angle_min = f64::INFINITY;
    let mut angle_max = f64::NEG_INFINITY;
    let mut usable = 0usize;
    Zip::from(alpha).and(diff).for_each(|&a, &d| {
        if !a.is_nan() && !d.is_nan() {
            angle_min = angle_min.min(a);
            angle_max = angle_max.max(a);
            usable += 1;
        }
    });
    if usable == 0 || !angle_min.is_finite() {
        return Err(Error::NumericalFit(
            "no valid samples for slope normalization".to_string(),
        ));
    }

    let edges: Vec<f64> = (0..=NBINS)
        .map(|i| angle_min + (angle_max - angle_min) * i as f64 / NBINS as f64)
        .collect();

    // Bins retained for the regression are those whose edges fall within
    // the [0, 1] quantiles of the angle distribution. Those quantiles are
    // the observed min/max, so every bin is retained; kept literal until
    // the intended trimming bounds are settled.
    let (v_min, v_max) = (angle_min, angle_max);
    let reg_edges: Vec<f64> = edges
        .iter()
        .copied()
        .filter(|&e| e >= v_min && e <= v_max)
        .collect();

    // Per-bin standard deviation of the difference, keyed by the bin's
    // left edge.
    let mut xs: Vec<f64> = Vec::new();
    let mut stds: Vec<f64> = Vec::new();
    for n in 0..reg_edges.len().saturating_sub(1) {
        let (lo, hi) = (reg_edges[n], reg_edges[n + 1]);
        let mut sum = 0.0;
        let mut sq_sum = 0.0;
        let mut count = 0usize;
        Zip::from(alpha).and(diff).for_each(|&a, &d| {
            if !a.is_nan() && !d.is_nan() && a > lo && a <= hi {
                sum += d;
                sq_sum += d * d;
                count += 1;
            }
        });
        if count > 1 {
            let mean = sum / count as f64;
            let var = (sq_sum / count as f64 - mean * mean).max(0.0);
            xs.push(lo.tan());
            stds.push(var.sqrt());
        }
    }

    if stds.len() <= 1 {
        error!(bins = stds.len(), "not enough slope bins to fit");
        return Err(Error::NumericalFit(format!(
            "slope normalization needs at least 2 populated bins, got {}",
            stds.len()
        )));
    }

    let (a, b) = linear_fit(&xs, &stds)?;
    debug!(a, b, bins = stds.len(), "slope normalization fit");

    // The factor depends only on the pixel's angle, so the original
    // bin-wise assignment collapses to a membership test against the
    // histogram's overall range.
    let factor = b / a;
    let mut normalized = Array2::<f64>::from_elem(diff.dim(), f64::NAN);

    let mut bias_sum = 0.0;
    let mut bias_count = 0usize;
    diff.iter().filter(|v| !v.is_nan()).for_each(|&v| {
        bias_sum += v;
        bias_count += 1;
    });
    let bias = bias_sum / bias_count as f64;

    Zip::from(&mut normalized)
        .and(alpha)
        .and(&tan_alpha)
        .and(diff)
        .for_each(|out, &ang, &tan, &d| {
            if !ang.is_nan() && ang >= edges[0] && ang <= edges[NBINS] {
                *out = (d - bias) / (1.0 + factor * tan);
            }
        });

    Ok(normalized)
}

/// Least-squares line `y = a * x + b`.
fn linear_fit(xs: &[f64], ys: &[f64]) -> Result<(f64, f64)> {
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var = 0.0;
    for (&x, &y) in xs.iter().zip(ys.iter()) {
        cov += (x - mean_x) * (y - mean_y);
        var += (x - mean_x) * (x - mean_x);
    }

    if var.abs() < f64::EPSILON {
        return Err(Error::NumericalFit(
            "degenerate slope distribution: all bins share one angle".to_string(),
        ));
    }

    let a = cov / var;
    let b = mean_y - a * mean_x;
    Ok((a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use demdiff_core::GeoTransform;
    use ndarray::Array2;

    #[test]
    fn test_linear_fit_exact() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [1.0, 3.0, 5.0, 7.0];
        let (a, b) = linear_fit(&xs, &ys).unwrap();
        assert_relative_eq!(a, 2.0, epsilon = 1e-12);
        assert_relative_eq!(b, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_linear_fit_degenerate() {
        let xs = [2.0, 2.0, 2.0];
        let ys = [1.0, 2.0, 3.0];
        assert!(linear_fit(&xs, &ys).is_err());
    }

    #[test]
    fn test_normalization_fails_on_flat_terrain() {
        // A perfectly flat secondary DEM puts every sample in one slope
        // bin: the regression cannot be fitted.
        let diff = Array2::from_shape_fn((8, 8), |(r, c)| (r + c) as f64 * 0.1);
        let alpha = Array2::zeros((8, 8));
        assert!(matches!(
            normalize_by_slope(&diff, &alpha),
            Err(Error::NumericalFit(_))
        ));
    }

    #[test]
    fn test_normalization_rescales_dispersion() {
        // Angle grows along rows, error dispersion grows with tan(angle):
        // the fitted line is std = k * tan(angle), so b ~ 0 and the
        // normalization factor ~ 1. The output is then the bias-corrected
        // difference.
        let (rows, cols) = (50, 40);
        let k = 2.5;
        let alpha = Array2::from_shape_fn((rows, cols), |(r, _)| {
            0.05 + 0.5 * r as f64 / rows as f64
        });
        let diff = Array2::from_shape_fn((rows, cols), |(r, c)| {
            let sign = if c % 2 == 0 { 1.0 } else { -1.0 };
            sign * k * (0.05 + 0.5 * r as f64 / rows as f64).tan()
        });

        let out = normalize_by_slope(&diff, &alpha).unwrap();

        let bias = diff.iter().sum::<f64>() / diff.len() as f64;
        for (o, &d) in out.iter().zip(diff.iter()) {
            assert!(!o.is_nan());
            // factor b/a ~ 0 -> output ~ diff - bias, up to the bin
            // quantization of the fitted line
            assert_relative_eq!(*o, d - bias, epsilon = 1e-2);
        }
    }

    #[test]
    fn test_process_smoke_on_varied_terrain() {
        let sec_img = Array2::from_shape_fn((30, 30), |(r, c)| {
            0.05 * (r * r) as f64 + 0.02 * (c * c) as f64
        });
        // Error amplitude grows with row, like the slope does
        let ref_img = Array2::from_shape_fn((30, 30), |(r, c)| {
            let noise = ((r * 31 + c * 17) % 7) as f64 - 3.0;
            sec_img[[r, c]] + noise * 0.05 * (1.0 + r as f64 / 10.0)
        });
        let gt = GeoTransform::new(0.0, 30.0, 1.0, -1.0);

        let primary = Dem::new(ref_img, gt, -9999.0);
        let secondary = Dem::new(sec_img, gt, -9999.0);

        let out = AltiDiffSlopeNorm
            .compute(&primary, Some(&secondary))
            .unwrap();
        let finite = out.image().iter().filter(|v| !v.is_nan()).count();
        assert!(finite > 0);
        assert_eq!(out.nodata(), -9999.0);
    }
}
