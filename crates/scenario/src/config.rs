//! # Dashboard Configuration
//!
//! Parses `soundview.toml` — the declarative config for the scenario
//! comparison dashboard. Every field has a default, so an empty file (or
//! no file at all) reproduces the reference Soundview setup.
//!
//! ## Table of Contents
//! 1. DashboardConfig — Top-level config
//! 2. AreaConfig — Sampling area
//! 3. ControlsConfig — Slider defaults
//! 4. LotsConfig — Mitigation lot source
//! 5. StyleConfig — Rendering hints
//! 6. Parsing

use serde::{Deserialize, Serialize};
use soundview_geo::LoaderOptions;
use std::path::{Path, PathBuf};

use crate::error::{Result, ScenarioError};
use crate::samples::SampleParams;

// ============================================================================
// 1. DashboardConfig — Top-level config
// ============================================================================

/// Top-level dashboard configuration, parsed from `soundview.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub area: AreaConfig,
    #[serde(default)]
    pub controls: ControlsConfig,
    #[serde(default)]
    pub lots: LotsConfig,
    #[serde(default)]
    pub style: StyleConfig,
}

// ============================================================================
// 2. AreaConfig — Sampling area
// ============================================================================

/// Where and how densely flood samples are drawn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaConfig {
    /// Center latitude (WGS84 degrees)
    #[serde(default = "default_center_lat")]
    pub center_lat: f64,
    /// Center longitude (WGS84 degrees)
    #[serde(default = "default_center_lon")]
    pub center_lon: f64,
    /// Standard deviation of sample positions, in degrees
    #[serde(default = "default_spread")]
    pub spread: f64,
    #[serde(default = "default_sample_count")]
    pub sample_count: usize,
    #[serde(default = "default_depth_min")]
    pub depth_min: f64,
    #[serde(default = "default_depth_max")]
    pub depth_max: f64,
    /// Fixed RNG seed; unset draws a fresh sample set per process
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for AreaConfig {
    fn default() -> Self {
        Self {
            center_lat: default_center_lat(),
            center_lon: default_center_lon(),
            spread: default_spread(),
            sample_count: default_sample_count(),
            depth_min: default_depth_min(),
            depth_max: default_depth_max(),
            seed: None,
        }
    }
}

fn default_center_lat() -> f64 { 40.8250 }
fn default_center_lon() -> f64 { -73.8700 }
fn default_spread() -> f64 { 0.007 }
fn default_sample_count() -> usize { 1200 }
fn default_depth_min() -> f64 { 2.0 }
fn default_depth_max() -> f64 { 12.0 }

// ============================================================================
// 3. ControlsConfig — Slider defaults
// ============================================================================

/// Initial slider positions and the storm window length
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlsConfig {
    /// Minutes into the storm
    #[serde(default = "default_time_step")]
    pub time_step: u32,
    /// Green space absorption percentage
    #[serde(default = "default_reduction")]
    pub reduction: u32,
    /// Storm window length in minutes
    #[serde(default = "default_storm_minutes")]
    pub storm_minutes: u32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            time_step: default_time_step(),
            reduction: default_reduction(),
            storm_minutes: default_storm_minutes(),
        }
    }
}

fn default_time_step() -> u32 { 30 }
fn default_reduction() -> u32 { 70 }
fn default_storm_minutes() -> u32 { 60 }

// ============================================================================
// 4. LotsConfig — Mitigation lot source
// ============================================================================

/// Lot dataset location and loader options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotsConfig {
    /// Path to a `.shp` or `.geojson` file, relative to the config file
    #[serde(default = "default_lots_path")]
    pub path: String,
    #[serde(flatten)]
    pub loader: LoaderOptions,
}

impl Default for LotsConfig {
    fn default() -> Self {
        Self {
            path: default_lots_path(),
            loader: LoaderOptions::default(),
        }
    }
}

fn default_lots_path() -> String {
    "VACANT_or_PARKING.shp".to_string()
}

// ============================================================================
// 5. StyleConfig — Rendering hints
// ============================================================================

/// Colors and camera settings handed to the map renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleConfig {
    /// RGBA for the baseline columns (red: warning)
    #[serde(default = "default_baseline_color")]
    pub baseline_color: [u8; 4],
    /// RGBA for the mitigated columns (blue)
    #[serde(default = "default_mitigated_color")]
    pub mitigated_color: [u8; 4],
    /// RGBA fill for lot polygons (green)
    #[serde(default = "default_lot_fill_color")]
    pub lot_fill_color: [u8; 4],
    #[serde(default = "default_lot_line_color")]
    pub lot_line_color: [u8; 3],
    #[serde(default = "default_elevation_scale")]
    pub elevation_scale: f32,
    /// Column radius in meters
    #[serde(default = "default_radius")]
    pub radius: f32,
    #[serde(default = "default_zoom")]
    pub zoom: f32,
    #[serde(default = "default_pitch")]
    pub pitch: f32,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            baseline_color: default_baseline_color(),
            mitigated_color: default_mitigated_color(),
            lot_fill_color: default_lot_fill_color(),
            lot_line_color: default_lot_line_color(),
            elevation_scale: default_elevation_scale(),
            radius: default_radius(),
            zoom: default_zoom(),
            pitch: default_pitch(),
        }
    }
}

fn default_baseline_color() -> [u8; 4] { [231, 76, 60, 160] }
fn default_mitigated_color() -> [u8; 4] { [52, 152, 219, 160] }
fn default_lot_fill_color() -> [u8; 4] { [46, 204, 113, 100] }
fn default_lot_line_color() -> [u8; 3] { [255, 255, 255] }
fn default_elevation_scale() -> f32 { 40.0 }
fn default_radius() -> f32 { 20.0 }
fn default_zoom() -> f32 { 14.0 }
fn default_pitch() -> f32 { 45.0 }

// ============================================================================
// 6. Parsing
// ============================================================================

impl DashboardConfig {
    /// Load a DashboardConfig from a `soundview.toml` file path
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ScenarioError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ScenarioError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Sampling parameters; these are the whole cache key for the sample set
    pub fn sample_params(&self) -> SampleParams {
        SampleParams {
            count: self.area.sample_count,
            center_lat: self.area.center_lat,
            center_lon: self.area.center_lon,
            spread: self.area.spread,
            depth_min: self.area.depth_min,
            depth_max: self.area.depth_max,
            seed: self.area.seed,
        }
    }

    /// Resolve the lot path against the config file directory
    pub fn lots_path(&self, config_dir: Option<&Path>) -> PathBuf {
        let relative = Path::new(&self.lots.path);
        match config_dir {
            Some(dir) if relative.is_relative() => dir.join(relative),
            _ => relative.to_path_buf(),
        }
    }
}
