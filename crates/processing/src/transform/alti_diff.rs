//! Altitude difference between two DEMs.

use demdiff_core::{Dem, Result};

use super::{check_aligned, elevation_difference, merge_attachments, require_secondary, DemTransform};

/// `alti-diff`: elementwise `primary - secondary`.
///
/// The derived raster keeps the secondary's georeferencing, inherits the
/// primary's nodata sentinel and carries both inputs' classification and
/// slope grids.
#[derive(Debug, Clone, Copy, Default)]
pub struct AltiDiff;

impl DemTransform for AltiDiff {
    fn name(&self) -> &'static str {
        "alti-diff"
    }

    fn fig_title(&self) -> &'static str {
        "[REF - SEC] difference"
    }

    fn colorbar_title(&self) -> &'static str {
        "Elevation difference (m)"
    }

    fn colormap(&self) -> &'static str {
        "bwr"
    }

    fn compute(&self, primary: &Dem, secondary: Option<&Dem>) -> Result<Dem> {
        let secondary = require_secondary(self.name(), secondary)?;
        check_aligned(self.name(), primary, secondary)?;

        let diff = elevation_difference(primary, secondary);

        let mut out = secondary.derived(diff)?;
        out.set_nodata(primary.nodata());
        merge_attachments(&mut out, primary, secondary)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use demdiff_core::{Error, GeoTransform};
    use ndarray::array;

    fn dem(image: ndarray::Array2<f64>, nodata: f64) -> Dem {
        Dem::new(image, GeoTransform::default(), nodata)
    }

    #[test]
    fn test_elementwise_difference() {
        let a = dem(array![[5.0, 4.0], [3.0, 2.0]], -9999.0);
        let b = dem(array![[1.0, 1.0], [1.0, 1.0]], -9999.0);

        let out = AltiDiff.compute(&a, Some(&b)).unwrap();
        assert_eq!(out.image()[[0, 0]], 4.0);
        assert_eq!(out.image()[[1, 1]], 1.0);
    }

    #[test]
    fn test_nodata_propagation() {
        let a = dem(array![[5.0, -9999.0]], -9999.0);
        let b = dem(array![[1.0, 1.0]], -32768.0);

        let out = AltiDiff.compute(&a, Some(&b)).unwrap();
        assert_eq!(out.image()[[0, 0]], 4.0);
        assert!(out.image()[[0, 1]].is_nan());
        assert_eq!(out.nodata(), -9999.0);
    }

    #[test]
    fn test_missing_secondary() {
        let a = dem(array![[1.0]], -9999.0);
        let err = AltiDiff.compute(&a, None).unwrap_err();
        assert!(matches!(err, Error::MissingSecondary("alti-diff")));
    }

    #[test]
    fn test_shape_mismatch() {
        let a = dem(array![[1.0, 2.0]], -9999.0);
        let b = dem(array![[1.0], [2.0]], -9999.0);
        assert!(AltiDiff.compute(&a, Some(&b)).is_err());
    }
}
