//! Angular difference between two DEMs' surface normals.

use ndarray::{Array2, Zip};

use demdiff_core::{Dem, Result};

use crate::terrain::surface_normals;

use super::{check_aligned, merge_attachments, require_secondary, DemTransform};

/// `angular-diff`: per-pixel angle between the two DEMs' surface
/// normals, in radians within [0, π/2].
#[derive(Debug, Clone, Copy, Default)]
pub struct AngularDiff;

impl DemTransform for AngularDiff {
    fn name(&self) -> &'static str {
        "angular-diff"
    }

    fn fig_title(&self) -> &'static str {
        "[REF vs SEC] angular difference"
    }

    fn colorbar_title(&self) -> &'static str {
        "Angular difference"
    }

    fn colormap(&self) -> &'static str {
        "twilight"
    }

    fn compute(&self, primary: &Dem, secondary: Option<&Dem>) -> Result<Dem> {
        let secondary = require_secondary(self.name(), secondary)?;
        check_aligned(self.name(), primary, secondary)?;

        let gt1 = primary.transform();
        let gt2 = secondary.transform();
        let n1 = surface_normals(primary.image(), gt1.pixel_width, gt1.pixel_height);
        let n2 = surface_normals(secondary.image(), gt2.pixel_width, gt2.pixel_height);

        let theta = angular_similarity(&n1, &n2);

        // Invalid input pixels do not reliably poison the one-sided
        // gradients at grid borders, so mask them explicitly.
        let mut masked = theta;
        Zip::from(&mut masked)
            .and(primary.image())
            .and(secondary.image())
            .for_each(|out, &a, &b| {
                if !primary.is_valid(a) || !secondary.is_valid(b) {
                    *out = f64::NAN;
                }
            });

        let mut out = secondary.derived(masked)?;
        out.set_nodata(primary.nodata());
        merge_attachments(&mut out, primary, secondary)?;
        Ok(out)
    }
}

/// Angle (radians) between two unit normal fields.
///
/// The scalar product is clamped to [-1, 1] before `acos`; taking its
/// absolute value folds the result into [0, π/2].
fn angular_similarity(n_a: &[Array2<f64>; 3], n_b: &[Array2<f64>; 3]) -> Array2<f64> {
    let mut theta = Array2::<f64>::zeros(n_a[0].dim());
    for (idx, out) in theta.indexed_iter_mut() {
        let dot = n_a[0][idx] * n_b[0][idx]
            + n_a[1][idx] * n_b[1][idx]
            + n_a[2][idx] * n_b[2][idx];
        *out = dot.clamp(-1.0, 1.0).abs().acos();
    }
    theta
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use demdiff_core::GeoTransform;
    use std::f64::consts::FRAC_PI_2;

    fn dem(image: Array2<f64>) -> Dem {
        Dem::new(image, GeoTransform::new(0.0, 0.0, 1.0, -1.0), -9999.0)
    }

    #[test]
    fn test_identical_dems_zero_angle() {
        let image = Array2::from_shape_fn((8, 8), |(r, c)| (r * 2 + c) as f64);
        let a = dem(image.clone());
        let b = dem(image);

        let out = AngularDiff.compute(&a, Some(&b)).unwrap();
        for &v in out.image().iter() {
            assert_relative_eq!(v, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_output_within_quarter_turn() {
        let a = dem(Array2::from_shape_fn((10, 10), |(r, c)| {
            (r as f64 * 7.3).sin() * 40.0 + c as f64 * 5.0
        }));
        let b = dem(Array2::from_shape_fn((10, 10), |(r, c)| {
            (c as f64 * 3.1).cos() * 25.0 - r as f64 * 4.0
        }));

        let out = AngularDiff.compute(&a, Some(&b)).unwrap();
        for &v in out.image().iter() {
            if !v.is_nan() {
                assert!((0.0..=FRAC_PI_2 + 1e-12).contains(&v));
            }
        }
    }

    #[test]
    fn test_invalid_pixels_masked() {
        let mut img_a = Array2::from_elem((4, 4), 10.0);
        img_a[[2, 2]] = f64::NAN;
        let a = dem(img_a);
        let b = dem(Array2::from_elem((4, 4), 5.0));

        let out = AngularDiff.compute(&a, Some(&b)).unwrap();
        assert!(out.image()[[2, 2]].is_nan());
        assert!(!out.image()[[0, 0]].is_nan());
    }
}
