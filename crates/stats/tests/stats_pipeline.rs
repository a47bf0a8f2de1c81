//! End-to-end: DEM difference -> classification layers -> statistics,
//! with and without on-disk persistence.

use std::collections::BTreeMap;

use approx::assert_relative_eq;
use ndarray::Array2;

use demdiff_core::{Dem, GeoTransform, Source};
use demdiff_processing::terrain::{slope, SlopeUnits};
use demdiff_processing::transform;
use demdiff_stats::{LayerConfig, LayerKind, MetricSpec, Mode, StatsConfig, StatsProcessing};

fn georef() -> GeoTransform {
    GeoTransform::new(600_000.0, 5_100_000.0, 30.0, -30.0)
}

/// A pair of DEMs whose difference is exactly one everywhere, with a
/// two-class status grid attached to the reference input.
fn classified_pair() -> (Dem, Dem) {
    let shape = (4, 4);
    let mut primary = Dem::new(Array2::from_elem(shape, 11.0), georef(), -9999.0);
    let secondary = Dem::new(Array2::from_elem(shape, 10.0), georef(), -9999.0);

    // top half labelled 0, bottom half labelled 1
    let status = Array2::from_shape_fn(shape, |(r, _)| if r < 2 { 0 } else { 1 });
    primary
        .attach_classification("Status", Source::Ref, status)
        .unwrap();
    (primary, secondary)
}

fn status_layer_cfg() -> LayerConfig {
    let mut cfg = LayerConfig::new(LayerKind::Segmentation);
    let mut classes = BTreeMap::new();
    classes.insert("good".to_string(), vec![0]);
    classes.insert("bad".to_string(), vec![1]);
    cfg.classes = Some(classes);
    cfg
}

#[test]
fn test_alti_diff_stats_on_uniform_difference() {
    let (primary, secondary) = classified_pair();
    let diff = transform::apply("alti-diff", &primary, Some(&secondary)).unwrap();

    let mut cfg = StatsConfig::default();
    cfg.classification_layers
        .insert("Status".to_string(), status_layer_cfg());
    cfg.metrics = Some(vec![MetricSpec::named("mean"), MetricSpec::named("sum")]);

    let processing = StatsProcessing::new(cfg, diff.dem).unwrap();
    assert_eq!(processing.layer_names(), vec!["Status", "global"]);

    let stats = processing.compute_stats(None, None).unwrap();

    // 8 pixels per class, difference is 1 everywhere
    for class in ["good", "bad"] {
        let mean = stats
            .get_classification_layer_metric("Status", class, Mode::Standard, "mean")
            .unwrap();
        assert_relative_eq!(mean.as_scalar().unwrap(), 1.0);
        let sum = stats
            .get_classification_layer_metric("Status", class, Mode::Standard, "sum")
            .unwrap();
        assert_relative_eq!(sum.as_scalar().unwrap(), 8.0);
    }

    // the global layer covers all 16 pixels
    let total = stats
        .get_classification_layer_metric("global", "valid", Mode::Standard, "sum")
        .unwrap();
    assert_relative_eq!(total.as_scalar().unwrap(), 16.0);

    // never-configured metric: strict lookup refuses
    assert!(stats
        .get_classification_layer_metric("Status", "good", Mode::Standard, "nmad")
        .is_err());
}

#[test]
fn test_slope_and_fusion_layers_through_pipeline() {
    let shape = (20, 20);
    // a tilted plane: constant slope, everything in one slope class
    let sec_img = Array2::from_shape_fn(shape, |(r, _)| r as f64 * 3.0);
    let ref_img = &sec_img + 1.0;

    let mut primary = Dem::new(ref_img, georef(), -9999.0);
    let secondary = Dem::new(sec_img, georef(), -9999.0);

    let status = Array2::from_shape_fn(shape, |(_, c)| if c < 10 { 0 } else { 1 });
    primary
        .attach_classification("Status", Source::Sec, status)
        .unwrap();
    primary
        .attach_slope(Source::Sec, slope(&secondary, SlopeUnits::Degrees))
        .unwrap();

    let diff = transform::apply("alti-diff", &primary, Some(&secondary)).unwrap();

    let mut slope_cfg = LayerConfig::new(LayerKind::Slope);
    slope_cfg.ranges = Some(vec![0.0, 45.0]);
    let mut fusion_cfg = LayerConfig::new(LayerKind::Fusion);
    fusion_cfg.sec_components = Some(vec!["Slope0".to_string(), "Status".to_string()]);

    let mut cfg = StatsConfig::default();
    cfg.classification_layers
        .insert("Status".to_string(), status_layer_cfg());
    cfg.classification_layers
        .insert("Slope0".to_string(), slope_cfg);
    cfg.classification_layers
        .insert("Fusion0".to_string(), fusion_cfg);

    let processing = StatsProcessing::new(cfg, diff.dem).unwrap();
    assert_eq!(
        processing.layer_names(),
        vec!["Slope0", "Status", "Fusion0", "global"]
    );

    // 2 slope classes x 2 status classes
    let fused = &processing.classification_layers()[2];
    assert_eq!(fused.class_names().len(), 4);

    let stats = processing.compute_stats(Some(&["Fusion0"]), None).unwrap();
    let mean = stats
        .get_classification_layer_metric(
            "Fusion0",
            "Slope0_[0%;45%[ & Status_good",
            Mode::Standard,
            "mean",
        )
        .unwrap();
    assert_relative_eq!(mean.as_scalar().unwrap(), 1.0);
}

#[test]
fn test_persistence_layout() {
    let out = tempfile::tempdir().unwrap();
    let (primary, secondary) = classified_pair();
    let diff = transform::apply("alti-diff", &primary, Some(&secondary)).unwrap();

    let mut cfg = StatsConfig::default();
    cfg.classification_layers
        .insert("Status".to_string(), status_layer_cfg());
    cfg.output_dir = Some(out.path().to_path_buf());

    let processing = StatsProcessing::new(cfg, diff.dem).unwrap();
    processing.compute_stats(None, None).unwrap();

    let stats_root = out.path().join("stats");
    assert!(stats_root.join("dem_for_stats.tif").is_file());
    for layer in ["Status", "global"] {
        assert!(stats_root.join(layer).join("stats_results.csv").is_file());
        assert!(stats_root.join(layer).join("stats_results.json").is_file());
        assert!(stats_root
            .join(layer)
            .join("ref_rectified_support_map.tif")
            .is_file());
    }
    // one source only: no intersection/exclusion tables
    assert!(!stats_root
        .join("Status")
        .join("stats_results_intersection.csv")
        .exists());
}

#[test]
fn test_no_output_dir_writes_nothing() {
    let probe = tempfile::tempdir().unwrap();
    let (primary, secondary) = classified_pair();
    let diff = transform::apply("alti-diff", &primary, Some(&secondary)).unwrap();

    let mut cfg = StatsConfig::default();
    cfg.classification_layers
        .insert("Status".to_string(), status_layer_cfg());

    let processing = StatsProcessing::new(cfg, diff.dem).unwrap();
    processing.compute_stats(None, None).unwrap();

    assert!(std::fs::read_dir(probe.path()).unwrap().next().is_none());
}
