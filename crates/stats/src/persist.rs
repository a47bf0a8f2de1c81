//! On-disk layout of statistics outputs.
//!
//! Everything lands under `<output_dir>/stats/`: the stats raster
//! itself as `dem_for_stats.tif`, and one subdirectory per layer
//! holding the per-mode result tables and the per-source rectified
//! support maps.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use demdiff_core::{io::write_geotiff, Dem, GeoTransform, Result};

use crate::layer::{ClassificationLayer, Mode};
use crate::metric::MetricValue;

/// One table row: class name plus (metric name, value) pairs
pub(crate) type Row = (String, Vec<(String, MetricValue)>);

fn layer_dir(root: &Path, layer: &str) -> PathBuf {
    root.join("stats").join(layer)
}

/// Write `stats_results[_<mode>].csv` and `.json` for one layer/mode
pub(crate) fn write_stats_tables(
    root: &Path,
    layer: &str,
    mode: Mode,
    rows: &[Row],
) -> Result<()> {
    let dir = layer_dir(root, layer);
    fs::create_dir_all(&dir)?;
    let base = format!("stats_results{}", mode.suffix());
    write_csv(&dir.join(format!("{base}.csv")), rows)?;
    write_json(&dir.join(format!("{base}.json")), rows)?;
    debug!(layer, mode = %mode, "wrote stats tables");
    Ok(())
}

fn write_csv(path: &Path, rows: &[Row]) -> Result<()> {
    let mut file = fs::File::create(path)?;
    if let Some((_, first)) = rows.first() {
        let header: Vec<&str> = std::iter::once("class_name")
            .chain(first.iter().map(|(name, _)| name.as_str()))
            .collect();
        writeln!(file, "{}", header.join(","))?;
    }
    for (class, values) in rows {
        let mut cells = vec![class.clone()];
        for (_, value) in values {
            cells.push(match value {
                MetricValue::Scalar(v) => format!("{v}"),
                // vector metrics keep one cell, values split by ';'
                MetricValue::Vector(vs) => vs
                    .iter()
                    .map(|v| format!("{v}"))
                    .collect::<Vec<_>>()
                    .join(";"),
            });
        }
        writeln!(file, "{}", cells.join(","))?;
    }
    Ok(())
}

fn write_json(path: &Path, rows: &[Row]) -> Result<()> {
    let mut doc = serde_json::Map::new();
    for (class, values) in rows {
        let mut entry = serde_json::Map::new();
        for (name, value) in values {
            entry.insert(name.clone(), metric_value_to_json(value));
        }
        doc.insert(class.clone(), serde_json::Value::Object(entry));
    }
    let file = fs::File::create(path)?;
    serde_json::to_writer_pretty(file, &serde_json::Value::Object(doc))
        .map_err(std::io::Error::from)?;
    Ok(())
}

/// JSON has no NaN/inf; non-finite scalars become null
fn metric_value_to_json(value: &MetricValue) -> serde_json::Value {
    let number = |v: f64| {
        serde_json::Number::from_f64(v)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    };
    match value {
        MetricValue::Scalar(v) => number(*v),
        MetricValue::Vector(vs) => {
            serde_json::Value::Array(vs.iter().map(|&v| number(v)).collect())
        }
    }
}

/// Write `<source>_rectified_support_map.tif` per available source
pub(crate) fn write_support_maps(
    root: &Path,
    layer: &ClassificationLayer,
    transform: &GeoTransform,
) -> Result<()> {
    let dir = layer_dir(root, layer.name());
    fs::create_dir_all(&dir)?;
    for source in layer.sources() {
        if let Some(map) = layer.support_map(source) {
            let path = dir.join(format!("{}_rectified_support_map.tif", source.as_str()));
            write_geotiff(&map, transform, path)?;
        }
    }
    Ok(())
}

/// Write the stats raster itself as `stats/dem_for_stats.tif`
pub(crate) fn write_stats_dem(root: &Path, dem: &Dem) -> Result<()> {
    let dir = root.join("stats");
    fs::create_dir_all(&dir)?;
    write_geotiff(dem.image(), dem.transform(), dir.join("dem_for_stats.tif"))
}
