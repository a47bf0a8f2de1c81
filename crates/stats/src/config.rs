//! Statistics run configuration.
//!
//! The configuration is plain data, deserialized from JSON with serde.
//! Validation that needs the DEM (attached grids, slope ranges) happens
//! when the classification layers are built, not here.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use demdiff_core::{Error, Result};

/// A metric request: a bare name, or a single-entry map from the metric
/// name to a parameter object, e.g.
/// `{"ratio_above_threshold": {"elevation_threshold": [0.5, 1.0]}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricSpec {
    Name(String),
    WithParams(BTreeMap<String, serde_json::Value>),
}

impl MetricSpec {
    /// Shorthand for a bare metric name
    pub fn named(name: &str) -> Self {
        MetricSpec::Name(name.to_string())
    }

    /// The metric name this entry requests
    pub fn metric_name(&self) -> Result<&str> {
        match self {
            MetricSpec::Name(name) => Ok(name),
            MetricSpec::WithParams(map) => {
                if map.len() != 1 {
                    return Err(Error::InvalidConfiguration(format!(
                        "a parameterized metric entry must have exactly one key, got {}",
                        map.len()
                    )));
                }
                // len() == 1 checked above
                Ok(map.keys().next().unwrap())
            }
        }
    }

    /// The parameter object, if the entry carries one
    pub(crate) fn params(&self) -> Option<&serde_json::Value> {
        match self {
            MetricSpec::Name(_) => None,
            MetricSpec::WithParams(map) => map.values().next(),
        }
    }
}

/// Kind of a classification layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Segmentation,
    Slope,
    Fusion,
    Global,
}

impl LayerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LayerKind::Segmentation => "segmentation",
            LayerKind::Slope => "slope",
            LayerKind::Fusion => "fusion",
            LayerKind::Global => "global",
        }
    }
}

/// One entry of the `classification_layers` map
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerConfig {
    #[serde(rename = "type")]
    pub kind: LayerKind,

    /// segmentation: class name to the label values it covers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classes: Option<BTreeMap<String, Vec<i32>>>,

    /// slope: strictly ascending degree boundaries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranges: Option<Vec<f64>>,

    /// fusion supported on the ref source: component layer names
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub ref_components: Option<Vec<String>>,

    /// fusion supported on the sec source: component layer names
    #[serde(default, rename = "sec", skip_serializing_if = "Option::is_none")]
    pub sec_components: Option<Vec<String>>,

    /// Layer-level metrics, extended with the run-level ones
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Vec<MetricSpec>>,
}

impl LayerConfig {
    /// A bare layer of the given kind, fields filled by the caller
    pub fn new(kind: LayerKind) -> Self {
        Self {
            kind,
            classes: None,
            ranges: None,
            ref_components: None,
            sec_components: None,
            metrics: None,
        }
    }
}

/// Top-level statistics configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Drop samples outside mean ± 3·std before evaluating metrics
    #[serde(default)]
    pub remove_outliers: bool,

    /// Declared classification layers, keyed by name
    #[serde(default)]
    pub classification_layers: BTreeMap<String, LayerConfig>,

    /// Run-level metrics, appended to every layer's own list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Vec<MetricSpec>>,

    /// Output root; when unset nothing is written to disk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}
