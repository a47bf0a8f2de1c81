//! Nearest-valid-neighbour fill for invalid raster pixels.

use std::collections::VecDeque;

use ndarray::Array2;

/// Replace the pixels flagged in `invalid` with the value of their
/// nearest valid neighbour.
///
/// Distance is grid distance over 4-connectivity, grown breadth-first
/// from every valid pixel at once. If the grid holds no valid pixel at
/// all the input is returned unchanged.
pub fn nearest_neighbour_fill(image: &Array2<f64>, invalid: &Array2<bool>) -> Array2<f64> {
    debug_assert_eq!(image.dim(), invalid.dim());

    let (rows, cols) = image.dim();
    let mut filled = image.clone();
    let mut visited = invalid.clone();
    let mut queue: VecDeque<(usize, usize)> = VecDeque::new();

    for ((r, c), &bad) in invalid.indexed_iter() {
        if !bad {
            queue.push_back((r, c));
        }
    }

    if queue.is_empty() {
        return filled;
    }

    while let Some((r, c)) = queue.pop_front() {
        let value = filled[[r, c]];
        let neighbours = [
            (r.wrapping_sub(1), c),
            (r + 1, c),
            (r, c.wrapping_sub(1)),
            (r, c + 1),
        ];
        for (nr, nc) in neighbours {
            if nr < rows && nc < cols && visited[[nr, nc]] {
                visited[[nr, nc]] = false;
                filled[[nr, nc]] = value;
                queue.push_back((nr, nc));
            }
        }
    }

    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fill_single_hole() {
        let image = array![[1.0, 1.0, 1.0], [1.0, f64::NAN, 1.0], [1.0, 1.0, 1.0]];
        let invalid = image.mapv(f64::is_nan);
        let filled = nearest_neighbour_fill(&image, &invalid);
        assert_eq!(filled[[1, 1]], 1.0);
    }

    #[test]
    fn test_fill_takes_nearest_value() {
        let image = array![
            [5.0, f64::NAN, f64::NAN, 9.0],
            [5.0, f64::NAN, f64::NAN, 9.0],
        ];
        let invalid = image.mapv(f64::is_nan);
        let filled = nearest_neighbour_fill(&image, &invalid);
        assert_eq!(filled[[0, 1]], 5.0);
        assert_eq!(filled[[0, 2]], 9.0);
        assert_eq!(filled[[1, 1]], 5.0);
        assert_eq!(filled[[1, 2]], 9.0);
    }

    #[test]
    fn test_all_invalid_unchanged() {
        let image = array![[f64::NAN, f64::NAN]];
        let invalid = image.mapv(f64::is_nan);
        let filled = nearest_neighbour_fill(&image, &invalid);
        assert!(filled.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_valid_pixels_untouched() {
        let image = array![[1.0, 2.0], [f64::NAN, 4.0]];
        let invalid = image.mapv(f64::is_nan);
        let filled = nearest_neighbour_fill(&image, &invalid);
        assert_eq!(filled[[0, 0]], 1.0);
        assert_eq!(filled[[0, 1]], 2.0);
        assert_eq!(filled[[1, 1]], 4.0);
    }
}
