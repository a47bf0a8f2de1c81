//! Slope calculation from DEMs
//!
//! Calculates the rate of change of elevation using the Horn (1981)
//! method, which uses a 3x3 neighborhood to compute partial derivatives.

use ndarray::Array2;

use crate::maybe_rayon::*;
use demdiff_core::Dem;

/// Units for slope output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlopeUnits {
    /// Degrees (0-90)
    #[default]
    Degrees,
    /// Radians (0-π/2)
    Radians,
}

/// Calculate the slope angle of a DEM.
///
/// Horn's (1981) method with a 3x3 neighborhood:
/// ```text
/// a b c
/// d e f
/// g h i
/// ```
///
/// dz/dx = ((c + 2f + i) - (a + 2d + g)) / (8 * cellsize_x)
/// dz/dy = ((g + 2h + i) - (a + 2b + c)) / (8 * cellsize_y)
/// slope = atan(sqrt(dz/dx² + dz/dy²))
///
/// Edge pixels and pixels with an invalid 3x3 neighborhood are NaN.
pub fn slope(dem: &Dem, units: SlopeUnits) -> Array2<f64> {
    let (rows, cols) = dem.shape();
    let image = dem.image();

    let eight_dx = 8.0 * dem.transform().cell_size_x();
    let eight_dy = 8.0 * dem.transform().cell_size_y();

    let output: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];

            for col in 0..cols {
                if row == 0 || row == rows - 1 || col == 0 || col == cols - 1 {
                    continue;
                }

                let e = image[[row, col]];
                if !dem.is_valid(e) {
                    continue;
                }

                let a = image[[row - 1, col - 1]];
                let b = image[[row - 1, col]];
                let c = image[[row - 1, col + 1]];
                let d = image[[row, col - 1]];
                let f = image[[row, col + 1]];
                let g = image[[row + 1, col - 1]];
                let h = image[[row + 1, col]];
                let i = image[[row + 1, col + 1]];

                if [a, b, c, d, f, g, h, i].iter().any(|&v| !dem.is_valid(v)) {
                    continue;
                }

                let dz_dx = ((c + 2.0 * f + i) - (a + 2.0 * d + g)) / eight_dx;
                let dz_dy = ((g + 2.0 * h + i) - (a + 2.0 * b + c)) / eight_dy;

                let slope_rad = (dz_dx * dz_dx + dz_dy * dz_dy).sqrt().atan();

                row_data[col] = match units {
                    SlopeUnits::Degrees => slope_rad.to_degrees(),
                    SlopeUnits::Radians => slope_rad,
                };
            }

            row_data
        })
        .collect();

    Array2::from_shape_vec((rows, cols), output)
        .expect("row-major collection matches raster shape")
}

#[cfg(test)]
mod tests {
    use super::*;
    use demdiff_core::GeoTransform;

    fn tilted_dem() -> Dem {
        // z = x + y over a unit grid
        let image = Array2::from_shape_fn((10, 10), |(r, c)| (r + c) as f64);
        Dem::new(image, GeoTransform::new(0.0, 10.0, 1.0, -1.0), -9999.0)
    }

    #[test]
    fn test_slope_flat() {
        let dem = Dem::new(
            Array2::from_elem((10, 10), 100.0),
            GeoTransform::new(0.0, 10.0, 1.0, -1.0),
            -9999.0,
        );
        let result = slope(&dem, SlopeUnits::Degrees);
        assert!(result[[5, 5]].abs() < 1e-9);
    }

    #[test]
    fn test_slope_tilted_uniform() {
        let dem = tilted_dem();
        let result = slope(&dem, SlopeUnits::Degrees);
        assert!((result[[3, 3]] - result[[5, 5]]).abs() < 1e-9);
        // gradient magnitude sqrt(2) -> atan(sqrt(2)) in degrees
        let expected = 2.0_f64.sqrt().atan().to_degrees();
        assert!((result[[5, 5]] - expected).abs() < 1e-9);
    }

    #[test]
    fn test_slope_edges_are_nan() {
        let dem = tilted_dem();
        let result = slope(&dem, SlopeUnits::Radians);
        assert!(result[[0, 0]].is_nan());
        assert!(result[[9, 5]].is_nan());
    }

    #[test]
    fn test_slope_units() {
        let dem = tilted_dem();
        let deg = slope(&dem, SlopeUnits::Degrees);
        let rad = slope(&dem, SlopeUnits::Radians);
        assert!((deg[[5, 5]] - rad[[5, 5]].to_degrees()).abs() < 1e-12);
    }
}
