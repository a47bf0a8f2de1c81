//! Affine geotransformation for rasters

use serde::{Deserialize, Serialize};

/// Affine transformation coefficients for georeferencing rasters.
///
/// Converts between pixel coordinates (col, row) and geographic
/// coordinates (x, y). For north-up images the rotation terms are 0 and
/// `pixel_height` is negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    /// Pixel width (cell size in X direction)
    pub pixel_width: f64,
    /// Pixel height (cell size in Y direction, usually negative)
    pub pixel_height: f64,
    /// Rotation about X axis (usually 0)
    pub row_rotation: f64,
    /// Rotation about Y axis (usually 0)
    pub col_rotation: f64,
}

impl GeoTransform {
    /// Create a new GeoTransform with no rotation (north-up image)
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// Create from a GDAL-style array
    /// `[origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height]`
    pub fn from_gdal(coeffs: [f64; 6]) -> Self {
        Self {
            origin_x: coeffs[0],
            pixel_width: coeffs[1],
            row_rotation: coeffs[2],
            origin_y: coeffs[3],
            col_rotation: coeffs[4],
            pixel_height: coeffs[5],
        }
    }

    /// Convert to a GDAL-style array
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.col_rotation,
            self.pixel_height,
        ]
    }

    /// Cell size in the X direction
    pub fn cell_size_x(&self) -> f64 {
        self.pixel_width.abs()
    }

    /// Cell size in the Y direction
    pub fn cell_size_y(&self) -> f64 {
        self.pixel_height.abs()
    }

    /// Cell size assuming square pixels
    pub fn cell_size(&self) -> f64 {
        self.pixel_width.abs()
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_gdal_roundtrip() {
        let gt = GeoTransform::new(100.0, 200.0, 10.0, -10.0);
        let back = GeoTransform::from_gdal(gt.to_gdal());
        assert_eq!(gt, back);
    }

    #[test]
    fn test_cell_sizes() {
        let gt = GeoTransform::new(0.0, 0.0, 2.0, -3.0);
        assert_relative_eq!(gt.cell_size_x(), 2.0);
        assert_relative_eq!(gt.cell_size_y(), 3.0);
        assert_relative_eq!(gt.cell_size(), 2.0);
    }
}
