//! Raster data structures

mod dem;
mod geotransform;

pub use dem::{BySource, Dem, Source};
pub use geotransform::GeoTransform;
