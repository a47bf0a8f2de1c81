//! Error types for demdiff

use thiserror::Error;

/// Main error type for demdiff operations.
///
/// Variants fall into three families: configuration errors (raised at
/// construction time), numerical errors (raised by a single transform
/// invocation) and lookup errors (unknown registry keys or missing
/// statistics). All propagate synchronously; nothing is retried.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch {
        er: usize,
        ec: usize,
        ar: usize,
        ac: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unsupported classification layer type: {0}")]
    UnsupportedClassificationKind(String),

    #[error("Slope ranges must be strictly ascending, got {0:?}")]
    NonAscendingRanges(Vec<f64>),

    #[error("Fusion layer references unknown component layer '{0}'")]
    UnknownFusionComponent(String),

    #[error("Transform '{0}' requires a secondary DEM")]
    MissingSecondary(&'static str),

    #[error("Numerical fit failed: {0}")]
    NumericalFit(String),

    #[error("Unknown DEM transform '{0}'")]
    UnknownTransform(String),

    #[error("Unknown metric '{0}'")]
    UnknownMetric(String),

    #[error("Unknown classification layer '{0}'")]
    UnknownClassificationLayer(String),

    #[error(
        "No statistic recorded for layer '{layer}', class '{class}', \
         mode '{mode}', metric '{metric}'"
    )]
    StatsKeyNotFound {
        layer: String,
        class: String,
        mode: String,
        metric: String,
    },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for demdiff operations
pub type Result<T> = std::result::Result<T, Error>;
