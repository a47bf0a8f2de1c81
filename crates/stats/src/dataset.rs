//! Keyed storage for computed statistics.

use std::collections::HashMap;

use demdiff_core::{Error, Result};

use crate::layer::Mode;
use crate::metric::MetricValue;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Key {
    layer: String,
    class: String,
    mode: Mode,
    metric: String,
}

/// Computed statistics, keyed by (layer, class, mode, metric).
///
/// Lookup is strict: asking for a combination that was never computed
/// is an error, never a silent default.
#[derive(Debug, Default)]
pub struct StatsDataset {
    values: HashMap<Key, MetricValue>,
}

impl StatsDataset {
    pub(crate) fn record(
        &mut self,
        layer: &str,
        class: &str,
        mode: Mode,
        metric: &str,
        value: MetricValue,
    ) {
        self.values.insert(
            Key {
                layer: layer.to_string(),
                class: class.to_string(),
                mode,
                metric: metric.to_string(),
            },
            value,
        );
    }

    /// Fetch one recorded statistic
    pub fn get_classification_layer_metric(
        &self,
        layer: &str,
        class: &str,
        mode: Mode,
        metric: &str,
    ) -> Result<&MetricValue> {
        self.values
            .get(&Key {
                layer: layer.to_string(),
                class: class.to_string(),
                mode,
                metric: metric.to_string(),
            })
            .ok_or_else(|| Error::StatsKeyNotFound {
                layer: layer.to_string(),
                class: class.to_string(),
                mode: mode.as_str().to_string(),
                metric: metric.to_string(),
            })
    }

    /// Number of recorded values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
