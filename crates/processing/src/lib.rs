//! # demdiff processing
//!
//! DEM-to-DEM transform strategies and the terrain math behind them.
//!
//! The entry point is the [`transform`] registry: a closed table mapping
//! a string key (`alti-diff`, `alti-diff-slope-norm`, `angular-diff`,
//! `ref-curvature`, `ref`, `sec`) to a strategy implementing
//! [`transform::DemTransform`]. Strategies consume one or two aligned
//! [`demdiff_core::Dem`] inputs and produce a derived raster carrying
//! forward the inputs' classification and slope attachments.

pub mod interpolation;
pub mod maybe_rayon;
pub mod terrain;
pub mod transform;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::terrain::{slope, surface_normals, SlopeUnits};
    pub use crate::transform::{DemTransform, TransformKind, TransformResult};
    pub use demdiff_core::prelude::*;
}
