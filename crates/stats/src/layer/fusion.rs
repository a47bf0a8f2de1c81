//! Fusion layers: cartesian products of already-built layers.

use ndarray::{Array2, Zip};

use demdiff_core::{BySource, Error, Result, Source};

use crate::config::{LayerConfig, LayerKind, MetricSpec};

use super::{resolve_metrics, ClassificationLayer};

/// Build a fusion layer over layers that were built before it.
///
/// The configuration names its support source (`ref` or `sec`) and at
/// least two component layers; every component must carry masks for
/// that source. Classes are the cartesian product of the component
/// classes, each fused mask the AND of its component masks. The fused
/// layer has masks for the support source only, so it always evaluates
/// in standard mode alone.
pub(crate) fn build_fusion(
    name: &str,
    cfg: &LayerConfig,
    run_metrics: Option<&[MetricSpec]>,
    built: &[ClassificationLayer],
) -> Result<ClassificationLayer> {
    let (support, component_names) = match (&cfg.ref_components, &cfg.sec_components) {
        (Some(names), None) => (Source::Ref, names),
        (None, Some(names)) => (Source::Sec, names),
        _ => {
            return Err(Error::InvalidConfiguration(format!(
                "fusion layer '{name}' must name exactly one support source ('ref' or 'sec')"
            )))
        }
    };
    if component_names.len() < 2 {
        return Err(Error::InvalidConfiguration(format!(
            "fusion layer '{name}' needs at least 2 component layers, got {}",
            component_names.len()
        )));
    }

    let mut components: Vec<&ClassificationLayer> = Vec::with_capacity(component_names.len());
    for component in component_names {
        let layer = built
            .iter()
            .find(|l| l.name() == component.as_str())
            .ok_or_else(|| Error::UnknownFusionComponent(component.clone()))?;
        if layer.masks.get(support).is_none() {
            return Err(Error::InvalidConfiguration(format!(
                "fusion component '{component}' has no masks for source '{support}'"
            )));
        }
        components.push(layer);
    }

    let mut classes: Vec<String> = Vec::new();
    let mut fused: Vec<Array2<bool>> = Vec::new();
    for component in &components {
        // presence checked above
        let component_masks = component.masks.get(support).unwrap();
        let labelled = component
            .classes
            .iter()
            .zip(component_masks)
            .map(|(class, mask)| (format!("{}_{}", component.name, class), mask));

        if classes.is_empty() {
            for (label, mask) in labelled {
                classes.push(label);
                fused.push(mask.clone());
            }
        } else {
            let mut next_classes = Vec::with_capacity(classes.len() * component.classes.len());
            let mut next_fused = Vec::with_capacity(next_classes.capacity());
            for (base_label, base_mask) in classes.iter().zip(&fused) {
                for (label, mask) in labelled.clone() {
                    next_classes.push(format!("{base_label} & {label}"));
                    next_fused.push(Zip::from(base_mask).and(mask).map_collect(|&a, &b| a && b));
                }
            }
            classes = next_classes;
            fused = next_fused;
        }
    }

    let mut masks = BySource::default();
    masks.set(support, fused);

    Ok(ClassificationLayer {
        name: name.to_string(),
        kind: LayerKind::Fusion,
        classes,
        masks,
        metrics: resolve_metrics(cfg.metrics.as_deref(), run_metrics)?,
    })
}
