//! # Soundview Scenario — Baseline vs Green Infrastructure
//!
//! Synthetic flood-depth comparison for the Soundview neighbourhood. One
//! sample set is generated and shared; every slider change derives a fresh
//! pair of depth columns from it:
//!
//! ```text
//! SampleSet ──┐
//!             ├── intensity(t) ──► baseline depth
//! LotIndex ───┴── reduction% ────► mitigated depth (inside lots only)
//! ```
//!
//! ## Modules
//! - `samples` — Generator, `SampleSet`, `SampleCache`
//! - `intensity` — Storm ramp
//! - `mitigation` — Depth columns + summary
//! - `session` — Controls, frames, shared data, per-session state
//! - `views` — Layer descriptors, status, GeoJSON export
//! - `plugin` — Headless Bevy plugin
//! - `config` — `soundview.toml`
//!
//! ## Table of Contents
//! 1. Module declarations
//! 2. Re-exports
//! 3. Prelude

pub mod config;
pub mod error;
pub mod intensity;
pub mod mitigation;
pub mod plugin;
pub mod samples;
pub mod session;
pub mod views;

pub use config::DashboardConfig;
pub use error::{Result, ScenarioError};
pub use intensity::{intensity, StormWindow};
pub use mitigation::{apply_mitigation, DerivedDepths, MitigationSummary};
pub use plugin::{FloodScenarioPlugin, ScenarioSet};
pub use samples::{generate_samples, SampleCache, SampleParams, SamplePoint, SampleSet};
pub use session::{ScenarioControls, ScenarioFrame, ScenarioSession, SharedScenarioData};
pub use views::{build_views, frame_to_geojson, lots_to_geojson, summary_text, ScenarioStatus, ScenarioViews};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::DashboardConfig;
    pub use crate::plugin::{FloodScenarioPlugin, ScenarioLots, ScenarioSamples, ScenarioSet};
    pub use crate::session::{ScenarioControls, ScenarioFrame, ScenarioSession};
    pub use crate::views::{ScenarioStatus, ScenarioViews};
}
