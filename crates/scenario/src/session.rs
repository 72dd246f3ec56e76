//! # Scenario Session
//!
//! "Generate once, derive per interaction". The sample set and the lot index
//! are loaded once and shared read-only; each session owns only its slider
//! positions and derives a fresh `ScenarioFrame` whenever asked.
//!
//! ## Table of Contents
//! 1. ScenarioControls — Slider values
//! 2. ScenarioFrame — One computed comparison
//! 3. SharedScenarioData — Immutable inputs shared across sessions
//! 4. ScenarioSession — Per-session state

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use soundview_geo::{load_lots, LotIndex, LotLoadOutcome};
use std::path::Path;
use std::sync::Arc;

use crate::config::DashboardConfig;
use crate::error::{Result, ScenarioError};
use crate::intensity::StormWindow;
use crate::mitigation::{apply_mitigation, DerivedDepths, MitigationSummary};
use crate::samples::{SampleCache, SampleSet};

// ============================================================================
// 1. ScenarioControls — Slider values
// ============================================================================

/// Upper bound of the storm timeline slider (minutes)
pub const MAX_TIME_STEP: u32 = 60;
/// Upper bound of the absorption slider (percent)
pub const MAX_REDUCTION: u32 = 100;

/// The two user-controlled sliders
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioControls {
    /// Minutes into the storm, `[0, 60]`
    pub time_step: u32,
    /// Green space absorption percentage, `[0, 100]`
    pub reduction: u32,
}

impl Default for ScenarioControls {
    fn default() -> Self {
        Self {
            time_step: 30,
            reduction: 70,
        }
    }
}

impl ScenarioControls {
    /// Validated constructor for library callers
    pub fn try_new(time_step: i64, reduction: i64) -> Result<Self> {
        let check = |name: &'static str, value: i64, max: u32| {
            if (0..=i64::from(max)).contains(&value) {
                Ok(value as u32)
            } else {
                Err(ScenarioError::InputOutOfRange {
                    name,
                    value,
                    min: 0,
                    max: i64::from(max),
                })
            }
        };
        Ok(Self {
            time_step: check("time_step", time_step, MAX_TIME_STEP)?,
            reduction: check("reduction", reduction, MAX_REDUCTION)?,
        })
    }

    /// Saturating constructor for UI boundaries
    pub fn clamped(time_step: i64, reduction: i64) -> Self {
        Self {
            time_step: time_step.clamp(0, i64::from(MAX_TIME_STEP)) as u32,
            reduction: reduction.clamp(0, i64::from(MAX_REDUCTION)) as u32,
        }
    }

    pub fn is_in_range(&self) -> bool {
        self.time_step <= MAX_TIME_STEP && self.reduction <= MAX_REDUCTION
    }

    /// Initial slider positions from `[controls]`
    pub fn from_config(config: &DashboardConfig) -> Self {
        Self::clamped(
            i64::from(config.controls.time_step),
            i64::from(config.controls.reduction),
        )
    }
}

// ============================================================================
// 2. ScenarioFrame — One computed comparison
// ============================================================================

/// Derived depths for one slider position. Never mutated after compute.
#[derive(Resource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioFrame {
    pub controls: ScenarioControls,
    pub intensity: f64,
    /// Parallel to the sample set
    pub depths: Vec<DerivedDepths>,
    pub summary: MitigationSummary,
}

impl ScenarioFrame {
    pub fn compute(samples: &SampleSet, lots: &LotIndex, controls: ScenarioControls, window: StormWindow) -> Self {
        let controls = Self::bounded(controls);
        let intensity = window.intensity(controls.time_step);
        let depths = apply_mitigation(samples.points(), intensity, f64::from(controls.reduction), lots);
        let summary = MitigationSummary::from_depths(&depths);

        tracing::debug!(
            "Frame T+{} reduction {}%: {} of {} samples in lots",
            controls.time_step,
            controls.reduction,
            summary.matched,
            summary.sample_count
        );

        Self {
            controls,
            intensity,
            depths,
            summary,
        }
    }

    fn bounded(controls: ScenarioControls) -> ScenarioControls {
        if controls.is_in_range() {
            controls
        } else {
            tracing::warn!("Controls {:?} outside slider range; clamping", controls);
            ScenarioControls::clamped(i64::from(controls.time_step), i64::from(controls.reduction))
        }
    }
}

// ============================================================================
// 3. SharedScenarioData — Immutable inputs shared across sessions
// ============================================================================

/// Sample set, lot index and load warnings. Cloning shares the data.
#[derive(Debug, Clone)]
pub struct SharedScenarioData {
    pub samples: Arc<SampleSet>,
    pub lots: Arc<LotIndex>,
    pub window: StormWindow,
    /// Recoverable load problems, reported once
    pub warnings: Vec<String>,
}

impl SharedScenarioData {
    pub fn new(samples: Arc<SampleSet>, lots: Arc<LotIndex>) -> Self {
        Self {
            samples,
            lots,
            window: StormWindow::default(),
            warnings: Vec::new(),
        }
    }

    /// Resolve samples through `cache` and load the configured lot dataset.
    /// Lot problems become warnings; only invalid sampling is an error.
    pub fn load(config: &DashboardConfig, config_dir: Option<&Path>, cache: &SampleCache) -> Result<Self> {
        let samples = cache.get_or_generate(&config.sample_params())?;
        let outcome = load_lots(&config.lots_path(config_dir), &config.lots.loader);
        Ok(Self::from_outcome(samples, outcome, StormWindow::new(config.controls.storm_minutes)))
    }

    pub fn from_outcome(samples: Arc<SampleSet>, outcome: LotLoadOutcome, window: StormWindow) -> Self {
        let warnings = outcome.warning().into_iter().collect();
        let lots = Arc::new(LotIndex::bulk_load(outcome.into_polygons()));
        Self {
            samples,
            lots,
            window,
            warnings,
        }
    }
}

// ============================================================================
// 4. ScenarioSession — Per-session state
// ============================================================================

/// One user's view of the shared data
#[derive(Debug, Clone)]
pub struct ScenarioSession {
    data: SharedScenarioData,
    controls: ScenarioControls,
}

impl ScenarioSession {
    pub fn new(data: SharedScenarioData) -> Self {
        Self {
            data,
            controls: ScenarioControls::default(),
        }
    }

    pub fn with_controls(data: SharedScenarioData, controls: ScenarioControls) -> Self {
        Self { data, controls }
    }

    pub fn data(&self) -> &SharedScenarioData {
        &self.data
    }

    pub fn controls(&self) -> ScenarioControls {
        self.controls
    }

    pub fn set_controls(&mut self, controls: ScenarioControls) {
        self.controls = controls;
    }

    /// Derive a fresh frame for the current controls
    pub fn compute(&self) -> ScenarioFrame {
        ScenarioFrame::compute(&self.data.samples, &self.data.lots, self.controls, self.data.window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samples::{SampleParams, SamplePoint};
    use geo::{LineString, MultiPolygon, Polygon};
    use soundview_geo::MitigationPolygon;

    fn shared() -> SharedScenarioData {
        let points = vec![
            SamplePoint { latitude: 0.5, longitude: 0.5, base_depth: 10.0 },
            SamplePoint { latitude: 5.0, longitude: 5.0, base_depth: 10.0 },
        ];
        let ring = LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]);
        let lot = MitigationPolygon::new(0, MultiPolygon::new(vec![Polygon::new(ring, vec![])]));

        SharedScenarioData::new(
            Arc::new(SampleSet::from_points(SampleParams::default(), points)),
            Arc::new(LotIndex::bulk_load(vec![lot])),
        )
    }

    #[test]
    fn try_new_rejects_out_of_range() {
        assert!(ScenarioControls::try_new(60, 100).is_ok());
        let err = ScenarioControls::try_new(61, 50).unwrap_err();
        assert!(matches!(err, ScenarioError::InputOutOfRange { name: "time_step", value: 61, .. }));
        assert!(matches!(
            ScenarioControls::try_new(30, -1),
            Err(ScenarioError::InputOutOfRange { name: "reduction", .. })
        ));
    }

    #[test]
    fn clamped_saturates() {
        assert_eq!(ScenarioControls::clamped(-5, 250), ScenarioControls { time_step: 0, reduction: 100 });
    }

    #[test]
    fn sessions_share_data_but_not_controls() {
        let data = shared();
        let mut a = ScenarioSession::new(data.clone());
        let b = ScenarioSession::new(data);
        a.set_controls(ScenarioControls { time_step: 30, reduction: 100 });

        assert!(Arc::ptr_eq(&a.data().samples, &b.data().samples));
        assert_eq!(a.compute().depths[0].mitigated_depth, 0.0);
        assert!((b.compute().depths[0].mitigated_depth - 3.0).abs() < 1e-9);
    }

    #[test]
    fn frame_clamps_controls_set_directly() {
        let data = shared();
        let session = ScenarioSession::with_controls(data, ScenarioControls { time_step: 90, reduction: 300 });
        let frame = session.compute();
        assert_eq!(frame.controls, ScenarioControls { time_step: 60, reduction: 100 });
        assert!(frame.depths.iter().all(|d| d.mitigated_depth >= 0.0));
    }

    #[test]
    fn missing_lot_file_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DashboardConfig::default();
        config.area.sample_count = 20;
        config.area.seed = Some(3);

        let cache = SampleCache::new();
        let data = SharedScenarioData::load(&config, Some(dir.path()), &cache).unwrap();

        assert!(data.lots.is_empty());
        assert_eq!(data.warnings.len(), 1);
        assert!(data.warnings[0].starts_with("Shapefile Error:"));

        let frame = ScenarioSession::new(data).compute();
        assert_eq!(frame.depths.len(), 20);
        assert!(frame.depths.iter().all(|d| d.mitigated_depth == d.baseline_depth));
    }
}
