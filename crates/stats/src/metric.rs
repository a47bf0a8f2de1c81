//! Metric registry: named statistics evaluated over 1-D samples.
//!
//! Metrics are parsed once from configuration entries and evaluated over
//! the sample vector of each (layer, class, mode) cell. Scalar metrics
//! on an empty sample yield NaN, except the two sums which yield 0;
//! `ratio_above_threshold` yields a zero per threshold.

use demdiff_core::{Error, Result};

use crate::config::MetricSpec;

/// Thresholds used when `ratio_above_threshold` is requested bare
const DEFAULT_RATIO_THRESHOLDS: [f64; 3] = [0.5, 1.0, 3.0];

/// NMAD scale factor relating MAD to the standard deviation of a
/// normal distribution
const NMAD_FACTOR: f64 = 1.4826;

/// A computed metric value
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl MetricValue {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            MetricValue::Scalar(v) => Some(*v),
            MetricValue::Vector(_) => None,
        }
    }

    pub fn as_vector(&self) -> Option<&[f64]> {
        match self {
            MetricValue::Scalar(_) => None,
            MetricValue::Vector(v) => Some(v),
        }
    }
}

/// A named statistic over a sample of raster values
#[derive(Debug, Clone, PartialEq)]
pub enum Metric {
    Mean,
    Median,
    Max,
    Min,
    Sum,
    SquaredSum,
    Std,
    Nmad,
    RatioAboveThreshold { thresholds: Vec<f64> },
}

impl Metric {
    /// Parse a configuration entry into a metric.
    ///
    /// Unknown names are a lookup error; a non-ascending threshold list
    /// is a configuration error.
    pub fn from_spec(spec: &MetricSpec) -> Result<Metric> {
        let name = spec.metric_name()?;
        match name {
            "mean" => Ok(Metric::Mean),
            "median" => Ok(Metric::Median),
            "max" => Ok(Metric::Max),
            "min" => Ok(Metric::Min),
            "sum" => Ok(Metric::Sum),
            "squared_sum" => Ok(Metric::SquaredSum),
            "std" => Ok(Metric::Std),
            "nmad" => Ok(Metric::Nmad),
            "ratio_above_threshold" => {
                let thresholds = match spec.params() {
                    Some(params) => parse_thresholds(params)?,
                    None => DEFAULT_RATIO_THRESHOLDS.to_vec(),
                };
                Ok(Metric::RatioAboveThreshold { thresholds })
            }
            other => Err(Error::UnknownMetric(other.to_string())),
        }
    }

    /// The metric set of an implicit global layer when no layers are
    /// declared at all
    pub fn global_defaults() -> Vec<Metric> {
        vec![
            Metric::Mean,
            Metric::Median,
            Metric::Max,
            Metric::Min,
            Metric::Sum,
            Metric::SquaredSum,
            Metric::Std,
        ]
    }

    /// Registry name
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Mean => "mean",
            Metric::Median => "median",
            Metric::Max => "max",
            Metric::Min => "min",
            Metric::Sum => "sum",
            Metric::SquaredSum => "squared_sum",
            Metric::Std => "std",
            Metric::Nmad => "nmad",
            Metric::RatioAboveThreshold { .. } => "ratio_above_threshold",
        }
    }

    /// Evaluate over a sample
    pub fn evaluate(&self, sample: &[f64]) -> MetricValue {
        match self {
            Metric::Mean => MetricValue::Scalar(mean(sample)),
            Metric::Median => MetricValue::Scalar(median(sample)),
            Metric::Max => MetricValue::Scalar(if sample.is_empty() {
                f64::NAN
            } else {
                sample.iter().fold(f64::NEG_INFINITY, |m, &v| m.max(v))
            }),
            Metric::Min => MetricValue::Scalar(if sample.is_empty() {
                f64::NAN
            } else {
                sample.iter().fold(f64::INFINITY, |m, &v| m.min(v))
            }),
            Metric::Sum => MetricValue::Scalar(sample.iter().sum()),
            Metric::SquaredSum => MetricValue::Scalar(sample.iter().map(|v| v * v).sum()),
            Metric::Std => MetricValue::Scalar(std(sample)),
            Metric::Nmad => MetricValue::Scalar(nmad(sample)),
            Metric::RatioAboveThreshold { thresholds } => {
                let n = sample.len();
                let ratios = thresholds
                    .iter()
                    .map(|&t| {
                        if n == 0 {
                            0.0
                        } else {
                            sample.iter().filter(|v| v.abs() >= t).count() as f64 / n as f64
                        }
                    })
                    .collect();
                MetricValue::Vector(ratios)
            }
        }
    }
}

fn parse_thresholds(params: &serde_json::Value) -> Result<Vec<f64>> {
    let list = params
        .get("elevation_threshold")
        .and_then(|v| v.as_array())
        .ok_or_else(|| {
            Error::InvalidConfiguration(
                "ratio_above_threshold needs an 'elevation_threshold' list".to_string(),
            )
        })?;
    let thresholds: Vec<f64> = list
        .iter()
        .map(|v| {
            v.as_f64().ok_or_else(|| {
                Error::InvalidConfiguration(format!("non-numeric elevation threshold: {v}"))
            })
        })
        .collect::<Result<_>>()?;
    if thresholds.windows(2).any(|w| w[0] >= w[1]) {
        return Err(Error::InvalidConfiguration(format!(
            "elevation thresholds must be strictly ascending, got {thresholds:?}"
        )));
    }
    Ok(thresholds)
}

fn mean(sample: &[f64]) -> f64 {
    if sample.is_empty() {
        return f64::NAN;
    }
    sample.iter().sum::<f64>() / sample.len() as f64
}

fn median(sample: &[f64]) -> f64 {
    if sample.is_empty() {
        return f64::NAN;
    }
    let mut sorted = sample.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

/// Population standard deviation
fn std(sample: &[f64]) -> f64 {
    if sample.is_empty() {
        return f64::NAN;
    }
    let m = mean(sample);
    let var = sample.iter().map(|&v| (v - m) * (v - m)).sum::<f64>() / sample.len() as f64;
    var.sqrt()
}

/// Normalized median absolute deviation
fn nmad(sample: &[f64]) -> f64 {
    if sample.is_empty() {
        return f64::NAN;
    }
    let med = median(sample);
    let deviations: Vec<f64> = sample.iter().map(|&v| (v - med).abs()).collect();
    NMAD_FACTOR * median(&deviations)
}
