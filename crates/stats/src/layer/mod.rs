//! Classification layers: named partitions of the stats raster into
//! classes, with per-source boolean masks.
//!
//! A layer owns one boolean mask per class per available source. How
//! the two sources combine into the pixel set actually sampled is the
//! [`Mode`]; layers carrying only one source expose standard mode only.

mod fusion;

pub(crate) use fusion::build_fusion;

use ndarray::{Array2, Zip};

use demdiff_core::{BySource, Dem, Error, Result, Source};

use crate::config::{LayerConfig, LayerKind, MetricSpec};
use crate::metric::Metric;

/// How the ref and sec class masks combine into the sampled pixel set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// The ref mask when present, else the sec mask
    Standard,
    /// Pixels classified identically by both sources
    Intersection,
    /// Pixels the ref source classifies but the sec source does not
    Exclusion,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Standard, Mode::Intersection, Mode::Exclusion];

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Standard => "standard",
            Mode::Intersection => "intersection",
            Mode::Exclusion => "exclusion",
        }
    }

    /// File-name suffix; standard mode has none
    pub(crate) fn suffix(self) -> &'static str {
        match self {
            Mode::Standard => "",
            Mode::Intersection => "_intersection",
            Mode::Exclusion => "_exclusion",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classification layer with its class masks and resolved metrics
#[derive(Debug, Clone)]
pub struct ClassificationLayer {
    name: String,
    kind: LayerKind,
    /// Class names, index-aligned with the mask vectors
    classes: Vec<String>,
    /// One mask per class, per available source
    masks: BySource<Vec<Array2<bool>>>,
    metrics: Vec<Metric>,
}

impl ClassificationLayer {
    /// Build a declared non-fusion layer from its configuration.
    ///
    /// This is the fail-fast point for layer configuration errors:
    /// missing class maps, missing attached grids, non-ascending slope
    /// boundaries.
    pub fn from_config(
        name: &str,
        cfg: &LayerConfig,
        run_metrics: Option<&[MetricSpec]>,
        dem: &Dem,
    ) -> Result<Self> {
        let metrics = resolve_metrics(cfg.metrics.as_deref(), run_metrics)?;
        match cfg.kind {
            LayerKind::Segmentation => Self::segmentation(name, cfg, metrics, dem),
            LayerKind::Slope => Self::slope(name, cfg, metrics, dem),
            LayerKind::Global => Ok(Self::global(name, metrics, dem)),
            LayerKind::Fusion => Err(Error::InvalidConfiguration(format!(
                "fusion layer '{name}' must be built after its components"
            ))),
        }
    }

    /// The single-class layer covering every valid pixel
    pub fn global(name: &str, metrics: Vec<Metric>, dem: &Dem) -> Self {
        let mut masks = BySource::default();
        masks.set(Source::Ref, vec![dem.valid_mask()]);
        Self {
            name: name.to_string(),
            kind: LayerKind::Global,
            classes: vec!["valid".to_string()],
            masks,
            metrics,
        }
    }

    fn segmentation(
        name: &str,
        cfg: &LayerConfig,
        metrics: Vec<Metric>,
        dem: &Dem,
    ) -> Result<Self> {
        let class_map = cfg.classes.as_ref().ok_or_else(|| {
            Error::InvalidConfiguration(format!(
                "segmentation layer '{name}' needs a 'classes' map"
            ))
        })?;
        if class_map.is_empty() {
            return Err(Error::InvalidConfiguration(format!(
                "segmentation layer '{name}' declares no classes"
            )));
        }
        let grids = dem.classification_layer(name).ok_or_else(|| {
            Error::InvalidConfiguration(format!(
                "no classification grids attached for layer '{name}'"
            ))
        })?;

        let classes: Vec<String> = class_map.keys().cloned().collect();
        let mut masks = BySource::default();
        for source in grids.sources() {
            // sources() only reports present slots
            let grid = grids.get(source).unwrap();
            let per_class = class_map
                .values()
                .map(|labels| grid.mapv(|v| labels.contains(&v)))
                .collect();
            masks.set(source, per_class);
        }

        Ok(Self {
            name: name.to_string(),
            kind: LayerKind::Segmentation,
            classes,
            masks,
            metrics,
        })
    }

    fn slope(name: &str, cfg: &LayerConfig, metrics: Vec<Metric>, dem: &Dem) -> Result<Self> {
        let ranges = cfg.ranges.as_ref().ok_or_else(|| {
            Error::InvalidConfiguration(format!("slope layer '{name}' needs a 'ranges' list"))
        })?;
        if ranges.is_empty() {
            return Err(Error::InvalidConfiguration(format!(
                "slope layer '{name}' declares no ranges"
            )));
        }
        if ranges.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::NonAscendingRanges(ranges.clone()));
        }
        let slopes = dem.slopes();
        if slopes.is_empty() {
            return Err(Error::InvalidConfiguration(format!(
                "slope layer '{name}' needs attached slope grids"
            )));
        }

        // Class i covers [ranges[i], ranges[i+1][, the last one is
        // unbounded above.
        let classes: Vec<String> = (0..ranges.len())
            .map(|i| match ranges.get(i + 1) {
                Some(hi) => format!("[{}%;{}%[", ranges[i], hi),
                None => format!("[{}%;inf[", ranges[i]),
            })
            .collect();

        let mut masks = BySource::default();
        for source in slopes.sources() {
            let grid = slopes.get(source).unwrap();
            let per_class = (0..ranges.len())
                .map(|i| {
                    let lo = ranges[i];
                    let hi = ranges.get(i + 1).copied();
                    grid.mapv(|v| {
                        !v.is_nan() && v >= lo && hi.map_or(true, |h| v < h)
                    })
                })
                .collect();
            masks.set(source, per_class);
        }

        Ok(Self {
            name: name.to_string(),
            kind: LayerKind::Slope,
            classes,
            masks,
            metrics,
        })
    }

    // Accessors

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    pub fn class_names(&self) -> &[String] {
        &self.classes
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    /// Sources this layer has masks for, ref first
    pub fn sources(&self) -> Vec<Source> {
        self.masks.sources()
    }

    /// Modes this layer can evaluate: all three when both sources carry
    /// masks, standard only otherwise
    pub fn available_modes(&self) -> Vec<Mode> {
        if self.masks.get(Source::Ref).is_some() && self.masks.get(Source::Sec).is_some() {
            Mode::ALL.to_vec()
        } else {
            vec![Mode::Standard]
        }
    }

    /// The combined mask of one class under a mode.
    ///
    /// `None` when the mode needs a source this layer does not carry.
    pub fn mode_mask(&self, class_idx: usize, mode: Mode) -> Option<Array2<bool>> {
        let reference = self.masks.get(Source::Ref).map(|m| &m[class_idx]);
        let secondary = self.masks.get(Source::Sec).map(|m| &m[class_idx]);
        match mode {
            Mode::Standard => reference.or(secondary).cloned(),
            Mode::Intersection => match (reference, secondary) {
                (Some(r), Some(s)) => {
                    Some(Zip::from(r).and(s).map_collect(|&a, &b| a && b))
                }
                _ => None,
            },
            // ref AND NOT(ref AND sec), i.e. classified by ref only
            Mode::Exclusion => match (reference, secondary) {
                (Some(r), Some(s)) => {
                    Some(Zip::from(r).and(s).map_collect(|&a, &b| a && !b))
                }
                _ => None,
            },
        }
    }

    /// Rasterize the class masks of one source into a class-id map:
    /// pixel value = class index, NaN where unclassified.
    pub fn support_map(&self, source: Source) -> Option<Array2<f64>> {
        let per_class = self.masks.get(source)?;
        let shape = per_class.first()?.dim();
        let mut map = Array2::<f64>::from_elem(shape, f64::NAN);
        for (idx, mask) in per_class.iter().enumerate() {
            Zip::from(&mut map).and(mask).for_each(|out, &m| {
                if m {
                    *out = idx as f64;
                }
            });
        }
        Some(map)
    }
}

/// Layer-level metric entries first, run-level entries appended,
/// duplicates by name dropped; an empty result defaults to `mean`.
pub(crate) fn resolve_metrics(
    layer: Option<&[MetricSpec]>,
    run: Option<&[MetricSpec]>,
) -> Result<Vec<Metric>> {
    let mut out: Vec<Metric> = Vec::new();
    for spec in layer.into_iter().flatten().chain(run.into_iter().flatten()) {
        let metric = Metric::from_spec(spec)?;
        if !out.iter().any(|m| m.name() == metric.name()) {
            out.push(metric);
        }
    }
    if out.is_empty() {
        out.push(Metric::Mean);
    }
    Ok(out)
}
