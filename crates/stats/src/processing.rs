//! Statistics orchestration over a classified stats raster.

use ndarray::Zip;
use tracing::{debug, info};

use demdiff_core::{Dem, Error, Result};

use crate::config::{LayerKind, MetricSpec, StatsConfig};
use crate::dataset::StatsDataset;
use crate::layer::{build_fusion, resolve_metrics, ClassificationLayer};
use crate::metric::Metric;
use crate::persist;

/// The statistics engine: a stats raster plus its classification
/// layers, built once and queried any number of times.
#[derive(Debug)]
pub struct StatsProcessing {
    cfg: StatsConfig,
    dem: Dem,
    layers: Vec<ClassificationLayer>,
}

impl StatsProcessing {
    /// Build every classification layer eagerly.
    ///
    /// Declared non-fusion layers come first, then fusion layers (which
    /// may therefore reference any declared layer regardless of the
    /// order the configuration map lists them in), then the implicit
    /// global layer. Construction is the fail-fast point for all
    /// configuration errors.
    pub fn new(cfg: StatsConfig, dem: Dem) -> Result<Self> {
        let run_metrics = cfg.metrics.as_deref();

        let mut layers = Vec::with_capacity(cfg.classification_layers.len() + 1);
        for (name, layer_cfg) in &cfg.classification_layers {
            if layer_cfg.kind != LayerKind::Fusion {
                layers.push(ClassificationLayer::from_config(
                    name,
                    layer_cfg,
                    run_metrics,
                    &dem,
                )?);
            }
        }
        let mut fused = Vec::new();
        for (name, layer_cfg) in &cfg.classification_layers {
            if layer_cfg.kind == LayerKind::Fusion {
                fused.push(build_fusion(name, layer_cfg, run_metrics, &layers)?);
            }
        }
        layers.extend(fused);

        if !layers.iter().any(|l| l.name() == "global") {
            // The sole implicit global layer of an otherwise empty run
            // gets the full default metric set; with declared layers it
            // follows the run-level metrics like everyone else.
            let metrics = if cfg.classification_layers.is_empty() {
                Metric::global_defaults()
            } else {
                resolve_metrics(None, run_metrics)?
            };
            layers.push(ClassificationLayer::global("global", metrics, &dem));
        }

        info!(layers = layers.len(), "classification layers ready");
        Ok(Self { cfg, dem, layers })
    }

    /// All layers, in evaluation order
    pub fn classification_layers(&self) -> &[ClassificationLayer] {
        &self.layers
    }

    /// Layer names, in evaluation order
    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.name()).collect()
    }

    /// The stats raster
    pub fn dem(&self) -> &Dem {
        &self.dem
    }

    /// Evaluate metrics over every (layer, class, mode) cell.
    ///
    /// `layer_subset` restricts evaluation to the named layers (unknown
    /// name is an error); `metrics_override` replaces every layer's
    /// metric list for this call. Results land in the returned dataset
    /// and, when an output root is configured, on disk.
    pub fn compute_stats(
        &self,
        layer_subset: Option<&[&str]>,
        metrics_override: Option<&[MetricSpec]>,
    ) -> Result<StatsDataset> {
        let selected: Vec<&ClassificationLayer> = match layer_subset {
            Some(names) => names
                .iter()
                .map(|&name| {
                    self.layers
                        .iter()
                        .find(|l| l.name() == name)
                        .ok_or_else(|| Error::UnknownClassificationLayer(name.to_string()))
                })
                .collect::<Result<_>>()?,
            None => self.layers.iter().collect(),
        };

        let override_metrics = match metrics_override {
            Some(specs) => Some(
                specs
                    .iter()
                    .map(Metric::from_spec)
                    .collect::<Result<Vec<_>>>()?,
            ),
            None => None,
        };

        let valid = self.dem.valid_mask();
        let mut dataset = StatsDataset::default();

        for layer in &selected {
            let metrics = override_metrics.as_deref().unwrap_or_else(|| layer.metrics());

            for mode in layer.available_modes() {
                let mut rows: Vec<persist::Row> = Vec::new();
                for (class_idx, class) in layer.class_names().iter().enumerate() {
                    // available_modes() guarantees the mask exists
                    let mask = layer.mode_mask(class_idx, mode).unwrap();

                    let mut sample: Vec<f64> = Vec::new();
                    Zip::from(&mask)
                        .and(&valid)
                        .and(self.dem.image())
                        .for_each(|&m, &ok, &v| {
                            if m && ok {
                                sample.push(v);
                            }
                        });
                    if self.cfg.remove_outliers {
                        sample = remove_outliers(sample);
                    }
                    debug!(
                        layer = layer.name(),
                        class = class.as_str(),
                        mode = %mode,
                        samples = sample.len(),
                        "evaluating metrics"
                    );

                    let mut row = Vec::with_capacity(metrics.len());
                    for metric in metrics {
                        let value = metric.evaluate(&sample);
                        dataset.record(layer.name(), class, mode, metric.name(), value.clone());
                        row.push((metric.name().to_string(), value));
                    }
                    rows.push((class.clone(), row));
                }

                if let Some(root) = &self.cfg.output_dir {
                    persist::write_stats_tables(root, layer.name(), mode, &rows)?;
                }
            }

            if let Some(root) = &self.cfg.output_dir {
                persist::write_support_maps(root, layer, self.dem.transform())?;
            }
        }

        if let Some(root) = &self.cfg.output_dir {
            persist::write_stats_dem(root, &self.dem)?;
        }

        Ok(dataset)
    }
}

/// Keep values within mean ± 3·std of the sample
fn remove_outliers(sample: Vec<f64>) -> Vec<f64> {
    if sample.is_empty() {
        return sample;
    }
    let n = sample.len() as f64;
    let mean = sample.iter().sum::<f64>() / n;
    let var = sample.iter().map(|&v| (v - mean) * (v - mean)).sum::<f64>() / n;
    let std = var.sqrt();
    let (lo, hi) = (mean - 3.0 * std, mean + 3.0 * std);
    sample.into_iter().filter(|&v| v >= lo && v <= hi).collect()
}
