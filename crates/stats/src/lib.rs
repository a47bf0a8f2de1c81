//! # demdiff stats
//!
//! Classification-driven statistics over a comparison raster.
//!
//! The entry point is [`StatsProcessing`]: built once from a
//! [`StatsConfig`] and an aligned [`demdiff_core::Dem`], it materializes
//! every classification layer (segmentation, slope, fusion, plus the
//! implicit global layer) and evaluates the configured metrics per
//! (layer, class, mode) cell into a strictly-keyed [`StatsDataset`].
//! With an output root configured, results are also written as CSV/JSON
//! tables and GeoTIFF support maps.

pub mod config;
pub mod dataset;
pub mod layer;
pub mod metric;
mod persist;
mod processing;

pub use config::{LayerConfig, LayerKind, MetricSpec, StatsConfig};
pub use dataset::StatsDataset;
pub use layer::{ClassificationLayer, Mode};
pub use metric::{Metric, MetricValue};
pub use processing::StatsProcessing;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::{LayerConfig, LayerKind, MetricSpec, StatsConfig};
    pub use crate::dataset::StatsDataset;
    pub use crate::layer::{ClassificationLayer, Mode};
    pub use crate::metric::{Metric, MetricValue};
    pub use crate::processing::StatsProcessing;
    pub use demdiff_core::prelude::*;
}
