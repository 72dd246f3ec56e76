//! Bevy plugin exposing the dashboard state as ECS resources
//!
//! ## Table of Contents
//! 1. Resources
//! 2. FloodScenarioPlugin
//! 3. Systems

use bevy::prelude::*;
use soundview_geo::LotIndex;
use std::path::Path;
use std::sync::Arc;

use crate::config::DashboardConfig;
use crate::error::Result;
use crate::intensity::StormWindow;
use crate::samples::{SampleCache, SampleSet};
use crate::session::{ScenarioControls, ScenarioFrame, SharedScenarioData};
use crate::views::{build_views, ScenarioStatus, ScenarioViews};

// ============================================================================
// 1. Resources
// ============================================================================

/// Shared immutable sample set
#[derive(Resource, Debug, Clone)]
pub struct ScenarioSamples(pub Arc<SampleSet>);

/// Shared immutable lot index
#[derive(Resource, Debug, Clone)]
pub struct ScenarioLots(pub Arc<LotIndex>);

/// Configuration the views are styled from
#[derive(Resource, Debug, Clone)]
pub struct ScenarioSettings {
    pub config: DashboardConfig,
    pub window: StormWindow,
}

/// System sets for ordering scenario systems
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScenarioSet {
    /// Bring slider values back into range
    Controls,
    /// Recompute frame, views and status
    Recompute,
}

// ============================================================================
// 2. FloodScenarioPlugin
// ============================================================================

/// Inserts the scenario resources and recomputes the derived frame whenever
/// `ScenarioControls` changes
pub struct FloodScenarioPlugin {
    data: SharedScenarioData,
    config: DashboardConfig,
}

impl FloodScenarioPlugin {
    pub fn new(data: SharedScenarioData, config: DashboardConfig) -> Self {
        Self { data, config }
    }

    /// Load samples (through `cache`) and lots for `config`
    pub fn from_config(config: DashboardConfig, config_dir: Option<&Path>, cache: &SampleCache) -> Result<Self> {
        let data = SharedScenarioData::load(&config, config_dir, cache)?;
        Ok(Self::new(data, config))
    }
}

impl Plugin for FloodScenarioPlugin {
    fn build(&self, app: &mut App) {
        let controls = ScenarioControls::from_config(&self.config);
        let frame = ScenarioFrame::compute(&self.data.samples, &self.data.lots, controls, self.data.window);
        let views = build_views(&self.data.samples, &self.data.lots, &frame, &self.config);

        for warning in &self.data.warnings {
            tracing::warn!("{}", warning);
        }
        let status = ScenarioStatus {
            warnings: self.data.warnings.clone(),
            info: Some(views.summary.clone()),
        };

        app.insert_resource(ScenarioSamples(Arc::clone(&self.data.samples)))
            .insert_resource(ScenarioLots(Arc::clone(&self.data.lots)))
            .insert_resource(ScenarioSettings {
                config: self.config.clone(),
                window: self.data.window,
            })
            .insert_resource(controls)
            .insert_resource(frame)
            .insert_resource(views)
            .insert_resource(status);

        app.configure_sets(Update, (ScenarioSet::Controls, ScenarioSet::Recompute).chain());

        app.add_systems(
            Update,
            (
                enforce_control_bounds.in_set(ScenarioSet::Controls),
                recompute_scenario.in_set(ScenarioSet::Recompute),
            )
                .run_if(resource_changed::<ScenarioControls>),
        );

        tracing::info!(
            "FloodScenarioPlugin initialized with {} samples and {} lots",
            self.data.samples.len(),
            self.data.lots.len()
        );
    }
}

// ============================================================================
// 3. Systems
// ============================================================================

/// Clamp controls written directly by UI code
pub fn enforce_control_bounds(mut controls: ResMut<ScenarioControls>) {
    if !controls.is_in_range() {
        let clamped = ScenarioControls::clamped(i64::from(controls.time_step), i64::from(controls.reduction));
        tracing::warn!("Controls {:?} out of range; clamped to {:?}", *controls, clamped);
        *controls = clamped;
    }
}

/// Derive a fresh frame, views and info line for the current controls
pub fn recompute_scenario(
    controls: Res<ScenarioControls>,
    samples: Res<ScenarioSamples>,
    lots: Res<ScenarioLots>,
    settings: Res<ScenarioSettings>,
    mut frame: ResMut<ScenarioFrame>,
    mut views: ResMut<ScenarioViews>,
    mut status: ResMut<ScenarioStatus>,
) {
    let next = ScenarioFrame::compute(&samples.0, &lots.0, *controls, settings.window);
    *views = build_views(&samples.0, &lots.0, &next, &settings.config);
    status.info = Some(views.summary.clone());
    *frame = next;

    tracing::info!(
        "Recomputed scenario at T+{} with {}% absorption",
        controls.time_step,
        controls.reduction
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samples::{SampleParams, SamplePoint};
    use geo::{LineString, MultiPolygon, Polygon};
    use soundview_geo::{LotLoadOutcome, MitigationPolygon, UnavailableReason};

    fn samples() -> Arc<SampleSet> {
        Arc::new(SampleSet::from_points(
            SampleParams::default(),
            vec![
                SamplePoint { latitude: 0.5, longitude: 0.5, base_depth: 10.0 },
                SamplePoint { latitude: 3.0, longitude: 3.0, base_depth: 10.0 },
            ],
        ))
    }

    fn app_with_lot() -> App {
        let ring = LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]);
        let lot = MitigationPolygon::new(0, MultiPolygon::new(vec![Polygon::new(ring, vec![])]));
        let data = SharedScenarioData::new(samples(), Arc::new(LotIndex::bulk_load(vec![lot])));

        let mut app = App::new();
        app.add_plugins(FloodScenarioPlugin::new(data, DashboardConfig::default()));
        app.update();
        app
    }

    #[test]
    fn initial_frame_uses_configured_controls() {
        let app = app_with_lot();
        let frame = app.world().resource::<ScenarioFrame>();

        assert_eq!(frame.controls, ScenarioControls::default());
        assert_eq!(frame.depths.len(), 2);
        assert!((frame.depths[0].mitigated_depth - 3.0).abs() < 1e-9);
        assert_eq!(frame.depths[1].mitigated_depth, 10.0);
    }

    #[test]
    fn control_change_recomputes_without_touching_samples() {
        let mut app = app_with_lot();
        let before = Arc::clone(&app.world().resource::<ScenarioSamples>().0);

        *app.world_mut().resource_mut::<ScenarioControls>() = ScenarioControls { time_step: 0, reduction: 70 };
        app.update();

        let frame = app.world().resource::<ScenarioFrame>();
        assert_eq!(frame.controls.time_step, 0);
        assert!(frame.depths.iter().all(|d| d.baseline_depth == 0.0));
        assert_eq!(
            app.world().resource::<ScenarioStatus>().info.as_deref().map(|s| s.starts_with("Visualizing T+0 minutes.")),
            Some(true)
        );
        assert!(Arc::ptr_eq(&before, &app.world().resource::<ScenarioSamples>().0));
    }

    #[test]
    fn out_of_range_controls_are_clamped() {
        let mut app = app_with_lot();
        *app.world_mut().resource_mut::<ScenarioControls>() = ScenarioControls { time_step: 90, reduction: 250 };
        app.update();

        assert_eq!(
            *app.world().resource::<ScenarioControls>(),
            ScenarioControls { time_step: 60, reduction: 100 }
        );
        let frame = app.world().resource::<ScenarioFrame>();
        assert_eq!(frame.depths[0].mitigated_depth, 0.0);
    }

    #[test]
    fn unavailable_lots_surface_as_status_warning() {
        let outcome = LotLoadOutcome::Unavailable(UnavailableReason::Missing("VACANT_or_PARKING.shp".into()));
        let data = SharedScenarioData::from_outcome(samples(), outcome, StormWindow::default());

        let mut app = App::new();
        app.add_plugins(FloodScenarioPlugin::new(data, DashboardConfig::default()));
        app.update();

        let status = app.world().resource::<ScenarioStatus>();
        assert_eq!(status.warnings, vec!["Shapefile Error: VACANT_or_PARKING.shp not found".to_string()]);
        let frame = app.world().resource::<ScenarioFrame>();
        assert!(frame.depths.iter().all(|d| d.mitigated_depth == d.baseline_depth));
        assert_eq!(app.world().resource::<ScenarioViews>().mitigated.layers.len(), 1);
    }
}
