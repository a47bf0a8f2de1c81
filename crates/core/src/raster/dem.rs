//! Aligned DEM raster with per-source attachments.
//!
//! A [`Dem`] is produced once by the external loading/coregistration
//! collaborator and is read-only inside the comparison core. Besides the
//! elevation grid it can carry, per input source (ref / sec):
//! - integer classification label grids, keyed by layer name
//! - slope-angle grids in degrees
//!
//! All attached grids share the elevation grid's shape; this is
//! validated on attach rather than assumed.

use std::collections::HashMap;

use ndarray::Array2;

use crate::error::{Error, Result};
use crate::raster::GeoTransform;

/// Which input DEM a per-source attachment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// Reference DEM
    Ref,
    /// Secondary DEM
    Sec,
}

impl Source {
    /// Both sources, in ref-first order
    pub const ALL: [Source; 2] = [Source::Ref, Source::Sec];

    /// Lowercase name used in configuration and output file names
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Ref => "ref",
            Source::Sec => "sec",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pair of optional per-source values.
#[derive(Debug, Clone)]
pub struct BySource<T> {
    reference: Option<T>,
    secondary: Option<T>,
}

impl<T> Default for BySource<T> {
    fn default() -> Self {
        Self {
            reference: None,
            secondary: None,
        }
    }
}

impl<T> BySource<T> {
    /// Get the value for a source, if present
    pub fn get(&self, source: Source) -> Option<&T> {
        match source {
            Source::Ref => self.reference.as_ref(),
            Source::Sec => self.secondary.as_ref(),
        }
    }

    /// Set the value for a source
    pub fn set(&mut self, source: Source, value: T) {
        match source {
            Source::Ref => self.reference = Some(value),
            Source::Sec => self.secondary = Some(value),
        }
    }

    /// Whether neither source has a value
    pub fn is_empty(&self) -> bool {
        self.reference.is_none() && self.secondary.is_none()
    }

    /// Sources that have a value, in ref-first order
    pub fn sources(&self) -> Vec<Source> {
        Source::ALL
            .into_iter()
            .filter(|&s| self.get(s).is_some())
            .collect()
    }
}

impl<T: Clone> BySource<T> {
    /// Fill empty slots from another pair, leaving present slots alone
    pub fn fill_missing_from(&mut self, other: &BySource<T>) {
        for source in Source::ALL {
            if self.get(source).is_none() {
                if let Some(value) = other.get(source) {
                    self.set(source, value.clone());
                }
            }
        }
    }
}

/// An aligned elevation raster with georeferencing and per-source
/// attachments.
#[derive(Debug, Clone)]
pub struct Dem {
    /// Elevation (or derived) samples, row-major
    image: Array2<f64>,
    /// Affine georeferencing
    transform: GeoTransform,
    /// Coordinate reference system identifier (e.g. "EPSG:32630")
    crs: Option<String>,
    /// No-data sentinel value
    nodata: f64,
    /// Classification label grids, keyed by layer name then source
    classification: HashMap<String, BySource<Array2<i32>>>,
    /// Slope-angle grids in degrees, keyed by source
    slopes: BySource<Array2<f64>>,
}

impl Dem {
    /// Create a DEM from an elevation grid
    pub fn new(image: Array2<f64>, transform: GeoTransform, nodata: f64) -> Self {
        Self {
            image,
            transform,
            crs: None,
            nodata,
            classification: HashMap::new(),
            slopes: BySource::default(),
        }
    }

    /// Create a derived raster sharing this DEM's georeferencing and
    /// nodata, with no attachments.
    ///
    /// The new image must have the same shape as this DEM's image.
    pub fn derived(&self, image: Array2<f64>) -> Result<Dem> {
        if image.dim() != self.image.dim() {
            let (er, ec) = self.image.dim();
            let (ar, ac) = image.dim();
            return Err(Error::SizeMismatch { er, ec, ar, ac });
        }
        Ok(Dem {
            image,
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: self.nodata,
            classification: HashMap::new(),
            slopes: BySource::default(),
        })
    }

    // Dimensions

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.image.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.image.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.image.dim()
    }

    // Data and metadata access

    /// The raster grid
    pub fn image(&self) -> &Array2<f64> {
        &self.image
    }

    /// The geotransform
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// The CRS identifier
    pub fn crs(&self) -> Option<&str> {
        self.crs.as_deref()
    }

    /// Set the CRS identifier
    pub fn set_crs(&mut self, crs: Option<String>) {
        self.crs = crs;
    }

    /// The nodata sentinel
    pub fn nodata(&self) -> f64 {
        self.nodata
    }

    /// Replace the nodata sentinel (e.g. a difference raster inherits
    /// the primary input's sentinel)
    pub fn set_nodata(&mut self, nodata: f64) {
        self.nodata = nodata;
    }

    // Validity

    /// Whether a sample value is valid (neither NaN nor nodata)
    pub fn is_valid(&self, value: f64) -> bool {
        !value.is_nan() && value != self.nodata
    }

    /// Boolean mask of valid pixels
    pub fn valid_mask(&self) -> Array2<bool> {
        self.image.mapv(|v| !v.is_nan() && v != self.nodata)
    }

    // Attachments

    /// Attach a classification label grid for a layer and source
    pub fn attach_classification(
        &mut self,
        layer: &str,
        source: Source,
        grid: Array2<i32>,
    ) -> Result<()> {
        self.check_shape(grid.dim())?;
        self.classification
            .entry(layer.to_string())
            .or_default()
            .set(source, grid);
        Ok(())
    }

    /// All classification label grids
    pub fn classification(&self) -> &HashMap<String, BySource<Array2<i32>>> {
        &self.classification
    }

    /// Label grids for one layer, if attached
    pub fn classification_layer(&self, layer: &str) -> Option<&BySource<Array2<i32>>> {
        self.classification.get(layer)
    }

    /// Replace all classification label grids (shapes validated)
    pub fn set_classification(
        &mut self,
        classification: HashMap<String, BySource<Array2<i32>>>,
    ) -> Result<()> {
        for pair in classification.values() {
            for source in pair.sources() {
                // unwrap is safe: sources() only reports present slots
                self.check_shape(pair.get(source).unwrap().dim())?;
            }
        }
        self.classification = classification;
        Ok(())
    }

    /// Attach a slope-angle grid in degrees for a source
    pub fn attach_slope(&mut self, source: Source, grid: Array2<f64>) -> Result<()> {
        self.check_shape(grid.dim())?;
        self.slopes.set(source, grid);
        Ok(())
    }

    /// Slope-angle grids in degrees
    pub fn slopes(&self) -> &BySource<Array2<f64>> {
        &self.slopes
    }

    /// Replace all slope grids (shapes validated)
    pub fn set_slopes(&mut self, slopes: BySource<Array2<f64>>) -> Result<()> {
        for source in slopes.sources() {
            self.check_shape(slopes.get(source).unwrap().dim())?;
        }
        self.slopes = slopes;
        Ok(())
    }

    fn check_shape(&self, dim: (usize, usize)) -> Result<()> {
        if dim != self.image.dim() {
            let (er, ec) = self.image.dim();
            let (ar, ac) = dim;
            return Err(Error::SizeMismatch { er, ec, ar, ac });
        }
        Ok(())
    }
}
