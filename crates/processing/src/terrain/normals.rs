//! Surface-normal vectors from elevation gradients.

use ndarray::{Array2, Axis};

/// Elevation gradient along one axis with the given sample spacing.
///
/// Central differences in the interior, one-sided differences at the
/// borders. NaN samples propagate to every difference they enter.
pub fn gradient(image: &Array2<f64>, axis: Axis, spacing: f64) -> Array2<f64> {
    let n = image.len_of(axis);
    let mut out = Array2::<f64>::zeros(image.dim());

    if n < 2 {
        out.fill(f64::NAN);
        return out;
    }

    for (lane, mut out_lane) in image
        .lanes(axis)
        .into_iter()
        .zip(out.lanes_mut(axis).into_iter())
    {
        out_lane[0] = (lane[1] - lane[0]) / spacing;
        out_lane[n - 1] = (lane[n - 1] - lane[n - 2]) / spacing;
        for i in 1..n - 1 {
            out_lane[i] = (lane[i + 1] - lane[i - 1]) / (2.0 * spacing);
        }
    }

    out
}

/// Unit surface-normal vector field of an elevation grid.
///
/// `dx` and `dy` are the pixel sizes carried by the geotransform (the
/// signed GDAL coefficients 1 and 5). Returns the three components
/// `[nx, ny, nz]`, each with the grid's shape; pixels whose gradient is
/// NaN yield NaN components.
pub fn surface_normals(image: &Array2<f64>, dx: f64, dy: f64) -> [Array2<f64>; 3] {
    let grad_y = gradient(image, Axis(0), dy);
    let grad_x = gradient(image, Axis(1), dx);

    let mut nx = Array2::<f64>::zeros(image.dim());
    let mut ny = Array2::<f64>::zeros(image.dim());
    let mut nz = Array2::<f64>::zeros(image.dim());

    for ((idx, gx), gy) in grad_x.indexed_iter().zip(grad_y.iter()) {
        let norm = (gx * gx + gy * gy + 1.0).sqrt();
        nx[idx] = -gx / norm;
        ny[idx] = -gy / norm;
        nz[idx] = 1.0 / norm;
    }

    [nx, ny, nz]
}
