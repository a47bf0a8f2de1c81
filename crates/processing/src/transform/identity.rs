//! Identity passthrough strategies for the two input DEMs.

use demdiff_core::{Dem, Result};

use super::{require_secondary, DemTransform};

/// `ref`: return the primary DEM unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct RefDem;

impl DemTransform for RefDem {
    fn name(&self) -> &'static str {
        "ref"
    }

    fn fig_title(&self) -> &'static str {
        "REF dem"
    }

    fn colorbar_title(&self) -> &'static str {
        "Elevation (m)"
    }

    fn colormap(&self) -> &'static str {
        "terrain"
    }

    fn compute(&self, primary: &Dem, _secondary: Option<&Dem>) -> Result<Dem> {
        Ok(primary.clone())
    }
}

/// `sec`: return the secondary DEM, carrying the primary's
/// classification grids (replacing its own; none if the primary has
/// none).
#[derive(Debug, Clone, Copy, Default)]
pub struct SecDem;

impl DemTransform for SecDem {
    fn name(&self) -> &'static str {
        "sec"
    }

    fn fig_title(&self) -> &'static str {
        "SEC dem"
    }

    fn colorbar_title(&self) -> &'static str {
        "Elevation (m)"
    }

    fn colormap(&self) -> &'static str {
        "terrain"
    }

    fn compute(&self, primary: &Dem, secondary: Option<&Dem>) -> Result<Dem> {
        let secondary = require_secondary(self.name(), secondary)?;
        let mut out = secondary.clone();
        out.set_classification(primary.classification().clone())?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use demdiff_core::{GeoTransform, Source};
    use ndarray::Array2;

    #[test]
    fn test_ref_passthrough() {
        let image = Array2::from_elem((3, 3), 7.0);
        let input = Dem::new(image.clone(), GeoTransform::default(), -1.0);
        let out = RefDem.compute(&input, None).unwrap();
        assert_eq!(out.image(), &image);
    }

    #[test]
    fn test_sec_takes_primary_masks() {
        let image = Array2::from_elem((3, 3), 7.0);
        let mut primary = Dem::new(image.clone(), GeoTransform::default(), -1.0);
        primary
            .attach_classification("status", Source::Ref, Array2::from_elem((3, 3), 1))
            .unwrap();

        let mut secondary = Dem::new(image, GeoTransform::default(), -1.0);
        secondary
            .attach_classification("other", Source::Sec, Array2::from_elem((3, 3), 9))
            .unwrap();

        let out = SecDem.compute(&primary, Some(&secondary)).unwrap();
        assert!(out.classification_layer("status").is_some());
        assert!(out.classification_layer("other").is_none());
    }
}
