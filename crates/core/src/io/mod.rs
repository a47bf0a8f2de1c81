//! Raster output
//!
//! Reading, reprojection and coregistration are external collaborators;
//! the core only writes the rasters produced by the statistics step.

mod native;

pub use native::write_geotiff;
