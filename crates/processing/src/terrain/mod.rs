//! Terrain derivatives used by the transform strategies and the slope
//! classification layer.

mod normals;
mod slope;

pub use normals::{gradient, surface_normals};
pub use slope::{slope, SlopeUnits};
