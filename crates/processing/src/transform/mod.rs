//! DEM transform registry.
//!
//! A closed, compile-time table of strategies deriving one raster from
//! one or two aligned input DEMs. Strategies are selected through
//! [`TransformKind`]; unknown string keys fail lookup with
//! [`Error::UnknownTransform`].

mod alti_diff;
mod angular_diff;
mod curvature;
mod identity;
mod slope_norm;

pub use alti_diff::AltiDiff;
pub use angular_diff::AngularDiff;
pub use curvature::RefCurvature;
pub use identity::{RefDem, SecDem};
pub use slope_norm::AltiDiffSlopeNorm;

use std::collections::HashMap;
use std::str::FromStr;

use ndarray::{Array2, Zip};

use demdiff_core::{BySource, Dem, Error, Result};

/// A derived raster plus the display metadata fixed per strategy.
#[derive(Debug, Clone)]
pub struct TransformResult {
    /// The derived raster, carrying merged classification/slope grids
    pub dem: Dem,
    /// Figure title
    pub fig_title: &'static str,
    /// Color-scale label
    pub colorbar_title: &'static str,
    /// Color-map name
    pub colormap: &'static str,
}

/// A DEM-to-DEM transform strategy.
///
/// Strategies are pure given their inputs. Inputs are guaranteed by the
/// caller to share grid, resolution and extent; shapes are still checked
/// and mismatches rejected.
pub trait DemTransform: Sync {
    /// Registry key of this strategy
    fn name(&self) -> &'static str;

    /// Figure title for the derived raster
    fn fig_title(&self) -> &'static str;

    /// Color-scale label for the derived raster
    fn colorbar_title(&self) -> &'static str;

    /// Color-map name for the derived raster
    fn colormap(&self) -> &'static str;

    /// Derive the output raster
    fn compute(&self, primary: &Dem, secondary: Option<&Dem>) -> Result<Dem>;

    /// Derive the output raster and attach display metadata
    fn process(&self, primary: &Dem, secondary: Option<&Dem>) -> Result<TransformResult> {
        tracing::debug!(transform = self.name(), "processing DEM transform");
        Ok(TransformResult {
            dem: self.compute(primary, secondary)?,
            fig_title: self.fig_title(),
            colorbar_title: self.colorbar_title(),
            colormap: self.colormap(),
        })
    }
}

static ALTI_DIFF: AltiDiff = AltiDiff;
static ALTI_DIFF_SLOPE_NORM: AltiDiffSlopeNorm = AltiDiffSlopeNorm;
static ANGULAR_DIFF: AngularDiff = AngularDiff;
static REF_CURVATURE: RefCurvature = RefCurvature::standard();
static REF_DEM: RefDem = RefDem;
static SEC_DEM: SecDem = SecDem;

/// Key of a registered DEM transform strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformKind {
    /// Elementwise elevation difference
    AltiDiff,
    /// Elevation difference normalized by the secondary DEM's slope
    AltiDiffSlopeNorm,
    /// Angular difference of surface normals
    AngularDiff,
    /// Spectral curvature of the reference DEM
    RefCurvature,
    /// Reference DEM passthrough
    Ref,
    /// Secondary DEM passthrough
    Sec,
}

impl TransformKind {
    /// All registered keys
    pub const ALL: [TransformKind; 6] = [
        TransformKind::AltiDiff,
        TransformKind::AltiDiffSlopeNorm,
        TransformKind::AngularDiff,
        TransformKind::RefCurvature,
        TransformKind::Ref,
        TransformKind::Sec,
    ];

    /// Registry key string
    pub fn as_str(self) -> &'static str {
        match self {
            TransformKind::AltiDiff => "alti-diff",
            TransformKind::AltiDiffSlopeNorm => "alti-diff-slope-norm",
            TransformKind::AngularDiff => "angular-diff",
            TransformKind::RefCurvature => "ref-curvature",
            TransformKind::Ref => "ref",
            TransformKind::Sec => "sec",
        }
    }

    /// The strategy registered under this key
    pub fn strategy(self) -> &'static dyn DemTransform {
        match self {
            TransformKind::AltiDiff => &ALTI_DIFF,
            TransformKind::AltiDiffSlopeNorm => &ALTI_DIFF_SLOPE_NORM,
            TransformKind::AngularDiff => &ANGULAR_DIFF,
            TransformKind::RefCurvature => &REF_CURVATURE,
            TransformKind::Ref => &REF_DEM,
            TransformKind::Sec => &SEC_DEM,
        }
    }
}

impl FromStr for TransformKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::UnknownTransform(s.to_string()))
    }
}

impl std::fmt::Display for TransformKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Look up a strategy by key and run it.
pub fn apply(key: &str, primary: &Dem, secondary: Option<&Dem>) -> Result<TransformResult> {
    TransformKind::from_str(key)?
        .strategy()
        .process(primary, secondary)
}

// Shared helpers for the binary strategies.

pub(crate) fn check_aligned(name: &'static str, a: &Dem, b: &Dem) -> Result<()> {
    if a.shape() != b.shape() {
        let (er, ec) = a.shape();
        let (ar, ac) = b.shape();
        tracing::warn!(transform = name, "input grids differ in shape");
        return Err(Error::SizeMismatch { er, ec, ar, ac });
    }
    Ok(())
}

pub(crate) fn require_secondary<'a>(
    name: &'static str,
    secondary: Option<&'a Dem>,
) -> Result<&'a Dem> {
    secondary.ok_or(Error::MissingSecondary(name))
}

/// Elementwise `primary - secondary`; a pixel invalid in either input
/// yields NaN.
pub(crate) fn elevation_difference(primary: &Dem, secondary: &Dem) -> Array2<f64> {
    let mut diff = Array2::<f64>::zeros(primary.shape());
    Zip::from(&mut diff)
        .and(primary.image())
        .and(secondary.image())
        .for_each(|out, &a, &b| {
            *out = if primary.is_valid(a) && secondary.is_valid(b) {
                a - b
            } else {
                f64::NAN
            };
        });
    diff
}

/// Merge both inputs' classification and slope grids onto the derived
/// raster: per layer and per source the primary's grid wins, the
/// secondary only fills slots the primary leaves empty. Grids are
/// copied, never recomputed.
pub(crate) fn merge_attachments(out: &mut Dem, primary: &Dem, secondary: &Dem) -> Result<()> {
    let mut classification: HashMap<String, BySource<Array2<i32>>> =
        primary.classification().clone();
    for (name, pair) in secondary.classification() {
        classification
            .entry(name.clone())
            .or_default()
            .fill_missing_from(pair);
    }
    out.set_classification(classification)?;

    let mut slopes = primary.slopes().clone();
    slopes.fill_missing_from(secondary.slopes());
    out.set_slopes(slopes)?;

    Ok(())
}
