//! # demdiff core
//!
//! Core types for the demdiff DEM comparison library.
//!
//! This crate provides:
//! - [`Dem`]: an aligned elevation raster with per-source attachments
//!   (classification label grids, slope grids)
//! - [`GeoTransform`]: affine georeferencing coefficients
//! - The shared [`Error`]/[`Result`] types
//! - Native GeoTIFF writing used by the statistics persistence step
//!
//! Loading, reprojection and coregistration of DEMs are external
//! collaborators: this crate only consumes already-aligned grids.

pub mod error;
pub mod io;
pub mod raster;

pub use error::{Error, Result};
pub use raster::{BySource, Dem, GeoTransform, Source};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::raster::{BySource, Dem, GeoTransform, Source};
}
