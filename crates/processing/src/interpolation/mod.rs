//! Grid interpolation helpers.

mod nearest_fill;

pub use nearest_fill::nearest_neighbour_fill;
