//! # Mitigation Engine
//!
//! Turns the immutable sample set into the two depth columns the dashboard
//! compares:
//!
//! - **baseline**: `base_depth * intensity`
//! - **mitigated**: baseline, reduced by `reduction%` for samples strictly
//!   inside any lot polygon (left join: every sample is kept)
//!
//! Columns are recomputed from scratch on every call; nothing is mutated in
//! place, so repeating a call with the same inputs gives the same frame.
//!
//! ## Table of Contents
//! 1. DerivedDepths
//! 2. apply_mitigation
//! 3. MitigationSummary

use serde::{Deserialize, Serialize};
use soundview_geo::LotIndex;

use crate::samples::SamplePoint;

// ============================================================================
// 1. DerivedDepths
// ============================================================================

/// Per-sample output, in the same order as the input samples
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedDepths {
    pub baseline_depth: f64,
    pub mitigated_depth: f64,
    /// Whether the sample fell inside at least one lot
    pub in_lot: bool,
}

// ============================================================================
// 2. apply_mitigation
// ============================================================================

/// Multiplier applied to contained samples, with `reduction_pct` clamped to
/// `[0, 100]`
pub fn reduction_factor(reduction_pct: f64) -> f64 {
    let pct = if reduction_pct.is_nan() { 0.0 } else { reduction_pct.clamp(0.0, 100.0) };
    1.0 - pct / 100.0
}

/// Compute baseline and mitigated depths for every sample.
///
/// `intensity_value` is clamped to `[0, 1]` and `reduction_pct` to
/// `[0, 100]`, so the result is never negative and never amplified. An empty
/// `lots` index leaves both columns identical.
pub fn apply_mitigation(
    samples: &[SamplePoint],
    intensity_value: f64,
    reduction_pct: f64,
    lots: &LotIndex,
) -> Vec<DerivedDepths> {
    let intensity_value = if intensity_value.is_nan() { 0.0 } else { intensity_value.clamp(0.0, 1.0) };
    let factor = reduction_factor(reduction_pct);

    samples
        .iter()
        .map(|sample| {
            let baseline_depth = sample.base_depth * intensity_value;
            let in_lot = !lots.is_empty() && lots.contains(sample.longitude, sample.latitude);
            let mitigated_depth = if in_lot { baseline_depth * factor } else { baseline_depth };
            DerivedDepths {
                baseline_depth,
                mitigated_depth,
                in_lot,
            }
        })
        .collect()
}

// ============================================================================
// 3. MitigationSummary
// ============================================================================

/// Aggregate numbers for one computed frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MitigationSummary {
    pub sample_count: usize,
    /// Samples inside at least one lot
    pub matched: usize,
    pub mean_baseline: f64,
    pub mean_mitigated: f64,
    /// Sum of `baseline - mitigated` over all samples
    pub total_reduction: f64,
}

impl MitigationSummary {
    pub fn from_depths(depths: &[DerivedDepths]) -> Self {
        if depths.is_empty() {
            return Self::default();
        }

        let n = depths.len() as f64;
        let baseline: f64 = depths.iter().map(|d| d.baseline_depth).sum();
        let mitigated: f64 = depths.iter().map(|d| d.mitigated_depth).sum();

        Self {
            sample_count: depths.len(),
            matched: depths.iter().filter(|d| d.in_lot).count(),
            mean_baseline: baseline / n,
            mean_mitigated: mitigated / n,
            total_reduction: baseline - mitigated,
        }
    }
}
