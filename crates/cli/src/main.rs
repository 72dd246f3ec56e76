//! # Soundview CLI
//!
//! Terminal front end for the flood-scenario comparison.
//!
//! ## Usage
//!
//! ```bash
//! # Compare baseline vs green infrastructure at the default sliders
//! soundview compare
//!
//! # Peak of the storm, 90% absorption, export for the map renderer
//! soundview compare --time-step 30 --reduction 90 \
//!     --views-out views.json --geojson-out frame.geojson
//!
//! # Sweep the storm timeline
//! soundview timeline --step 5 --reduction 70
//!
//! # Inspect the lot dataset (restoring a missing .shx)
//! soundview lots --lots data/VACANT_or_PARKING.shp --source-crs EPSG:2263
//! ```
//!
//! ## Configuration (soundview.toml)
//!
//! ```toml
//! [area]
//! center_lat = 40.8250
//! center_lon = -73.8700
//! sample_count = 1200
//! seed = 42
//!
//! [controls]
//! time_step = 30
//! reduction = 70
//!
//! [lots]
//! path = "VACANT_or_PARKING.shp"
//! restore_missing_spatial_index = true
//! ```

use anyhow::{bail, Context, Result};
use bevy::prelude::*;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use soundview_geo::{load_lots, LotLoadOutcome};
use soundview_scenario::plugin::{FloodScenarioPlugin, ScenarioSamples};
use soundview_scenario::{
    frame_to_geojson, DashboardConfig, SampleCache, ScenarioControls, ScenarioFrame, ScenarioSession, ScenarioStatus,
    ScenarioViews, SharedScenarioData,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_CONFIG: &str = "soundview.toml";

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "soundview")]
#[command(about = "Soundview flood scenarios: current vs green infrastructure")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./soundview.toml when present)
    #[arg(short, long, global = true, env = "SOUNDVIEW_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute both scenarios for one slider position
    Compare(CompareArgs),
    /// Sweep the storm timeline at a fixed absorption
    Timeline(TimelineArgs),
    /// Load the lot dataset and report what was found
    Lots(LotArgs),
}

/// Lot source overrides shared by every subcommand
#[derive(Args, Debug, Clone, Default)]
struct LotArgs {
    /// Lot dataset (.shp, .geojson or .json)
    #[arg(long)]
    lots: Option<PathBuf>,

    /// Treat a missing .shx index as an error instead of rebuilding it
    #[arg(long)]
    no_restore_index: bool,

    /// Source CRS of the lot data (EPSG:<code> or WKT), overrides the .prj
    #[arg(long)]
    source_crs: Option<String>,
}

#[derive(Args, Debug)]
struct CompareArgs {
    /// Minutes into the storm [0, 60]
    #[arg(short, long)]
    time_step: Option<i64>,

    /// Green space absorption percentage [0, 100]
    #[arg(short, long)]
    reduction: Option<i64>,

    /// Fixed RNG seed for the sample set
    #[arg(long)]
    seed: Option<u64>,

    /// Write layer descriptors and view state as JSON
    #[arg(long)]
    views_out: Option<PathBuf>,

    /// Write the depth frame as GeoJSON points
    #[arg(long)]
    geojson_out: Option<PathBuf>,

    #[command(flatten)]
    lots: LotArgs,
}

#[derive(Args, Debug)]
struct TimelineArgs {
    /// Minutes between rows
    #[arg(long, default_value = "10")]
    step: u32,

    /// Green space absorption percentage [0, 100]
    #[arg(short, long)]
    reduction: Option<i64>,

    /// Fixed RNG seed for the sample set
    #[arg(long)]
    seed: Option<u64>,

    #[command(flatten)]
    lots: LotArgs,
}

// ============================================================================
// Configuration
// ============================================================================

/// Load the config and the directory lot paths are resolved against.
/// An explicit path must load; the implicit default only warns.
fn load_config(explicit: Option<&Path>) -> Result<(DashboardConfig, Option<PathBuf>)> {
    if let Some(path) = explicit {
        let config = DashboardConfig::load(path).with_context(|| format!("loading {}", path.display()))?;
        return Ok((config, path.parent().map(Path::to_path_buf)));
    }

    let implicit = Path::new(DEFAULT_CONFIG);
    if !implicit.exists() {
        return Ok((DashboardConfig::default(), None));
    }
    match DashboardConfig::load(implicit) {
        Ok(config) => Ok((config, None)),
        Err(e) => {
            warn!("{}, using defaults", e);
            Ok((DashboardConfig::default(), None))
        }
    }
}

fn apply_lot_overrides(config: &mut DashboardConfig, args: &LotArgs) {
    if let Some(path) = &args.lots {
        config.lots.path = path.to_string_lossy().into_owned();
    }
    if args.no_restore_index {
        config.lots.loader.restore_missing_spatial_index = false;
    }
    if let Some(crs) = &args.source_crs {
        config.lots.loader.source_crs = Some(crs.clone());
    }
}

/// Slider values from flags, falling back to `[controls]`; rejects values
/// outside the slider ranges
fn resolve_controls(config: &DashboardConfig, time_step: Option<i64>, reduction: Option<i64>) -> Result<ScenarioControls> {
    let time_step = time_step.unwrap_or_else(|| i64::from(config.controls.time_step));
    let reduction = reduction.unwrap_or_else(|| i64::from(config.controls.reduction));
    Ok(ScenarioControls::try_new(time_step, reduction)?)
}

// ============================================================================
// Commands
// ============================================================================

fn run_compare(mut config: DashboardConfig, config_dir: Option<&Path>, args: CompareArgs) -> Result<()> {
    apply_lot_overrides(&mut config, &args.lots);
    if args.seed.is_some() {
        config.area.seed = args.seed;
    }
    let controls = resolve_controls(&config, args.time_step, args.reduction)?;

    let cache = SampleCache::new();
    let plugin = FloodScenarioPlugin::from_config(config, config_dir, &cache)?;

    let mut app = App::new();
    app.add_plugins(plugin);
    app.insert_resource(controls);
    app.update();

    let world = app.world();
    let frame = world.resource::<ScenarioFrame>();
    let views = world.resource::<ScenarioViews>();
    let status = world.resource::<ScenarioStatus>();

    print_warnings(&status.warnings);
    println!();
    println!("{}", views.baseline.heading.red().bold());
    println!("  mean depth      {:>8.3}", frame.summary.mean_baseline);
    println!("{}", views.mitigated.heading.blue().bold());
    println!("  mean depth      {:>8.3}", frame.summary.mean_mitigated);
    println!(
        "  samples in lots {:>8} / {}",
        frame.summary.matched.to_string().green(),
        frame.summary.sample_count
    );
    println!("  total reduction {:>8.3}", frame.summary.total_reduction);
    println!();
    if let Some(info) = &status.info {
        println!("{} {}", "ℹ".cyan(), info);
    }

    if let Some(path) = &args.views_out {
        let json = serde_json::to_string_pretty(views)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        info!("Wrote views to {}", path.display());
    }
    if let Some(path) = &args.geojson_out {
        let samples = world.resource::<ScenarioSamples>();
        let json = serde_json::to_string_pretty(&frame_to_geojson(&samples.0, frame))?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        info!("Wrote depth frame to {}", path.display());
    }
    Ok(())
}

fn run_timeline(mut config: DashboardConfig, config_dir: Option<&Path>, args: TimelineArgs) -> Result<()> {
    if args.step == 0 {
        bail!("--step must be positive");
    }
    apply_lot_overrides(&mut config, &args.lots);
    if args.seed.is_some() {
        config.area.seed = args.seed;
    }
    let base = resolve_controls(&config, Some(0), args.reduction)?;

    let cache = SampleCache::new();
    let data = SharedScenarioData::load(&config, config_dir, &cache)?;
    print_warnings(&data.warnings);

    let minutes = data.window.minutes;
    let mut session = ScenarioSession::with_controls(data, base);

    println!(
        "{}",
        format!("{:>5}  {:>9}  {:>9}  {:>9}  {:>7}", "T+min", "intensity", "baseline", "mitigated", "in lots").bold()
    );
    for time_step in (0..=minutes.min(60)).step_by(args.step as usize) {
        session.set_controls(ScenarioControls { time_step, ..base });
        let frame = session.compute();
        println!(
            "{:>5}  {:>9.3}  {:>9.3}  {:>9.3}  {:>7}",
            time_step, frame.intensity, frame.summary.mean_baseline, frame.summary.mean_mitigated, frame.summary.matched
        );
    }
    Ok(())
}

fn run_lots(mut config: DashboardConfig, config_dir: Option<&Path>, args: LotArgs) -> Result<()> {
    apply_lot_overrides(&mut config, &args);
    let path = config.lots_path(config_dir);

    match load_lots(&path, &config.lots.loader) {
        LotLoadOutcome::Loaded(lots) => {
            println!("{} {} lots from {}", "✓".green(), lots.len(), path.display());
            for lot in lots.iter().take(10) {
                let name = lot.name.as_deref().unwrap_or("-");
                println!("  #{:<6} {:<30} {} part(s)", lot.index, name, lot.geometry.0.len());
            }
            if lots.len() > 10 {
                println!("  ... {} more", lots.len() - 10);
            }
        }
        outcome @ LotLoadOutcome::Unavailable(_) => {
            print_warnings(&outcome.warning().into_iter().collect::<Vec<_>>());
        }
    }
    Ok(())
}

fn print_warnings(warnings: &[String]) {
    for warning in warnings {
        eprintln!("{} {}", "⚠".yellow(), warning.yellow());
    }
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let (config, config_dir) = load_config(cli.config.as_deref())?;
    let config_dir = config_dir.as_deref();

    match cli.command {
        Command::Compare(args) => run_compare(config, config_dir, args),
        Command::Timeline(args) => run_timeline(config, config_dir, args),
        Command::Lots(args) => run_lots(config, config_dir, args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_compare_flags() {
        let cli = Cli::try_parse_from([
            "soundview",
            "compare",
            "--time-step",
            "45",
            "--reduction",
            "90",
            "--lots",
            "lots.geojson",
            "--no-restore-index",
        ])
        .unwrap();

        match cli.command {
            Command::Compare(args) => {
                assert_eq!(args.time_step, Some(45));
                assert_eq!(args.reduction, Some(90));
                assert!(args.lots.no_restore_index);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn flags_override_config_controls() {
        let config = DashboardConfig::default();
        assert_eq!(
            resolve_controls(&config, None, Some(20)).unwrap(),
            ScenarioControls { time_step: 30, reduction: 20 }
        );
        assert!(resolve_controls(&config, Some(61), None).is_err());
    }

    #[test]
    fn lot_overrides_reach_loader_options() {
        let mut config = DashboardConfig::default();
        let args = LotArgs {
            lots: Some(PathBuf::from("parcels.shp")),
            no_restore_index: true,
            source_crs: Some("EPSG:2263".to_string()),
        };
        apply_lot_overrides(&mut config, &args);

        assert_eq!(config.lots.path, "parcels.shp");
        assert!(!config.lots.loader.restore_missing_spatial_index);
        assert_eq!(config.lots.loader.source_crs.as_deref(), Some("EPSG:2263"));
    }

    #[test]
    fn explicit_config_must_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("soundview.toml");
        std::fs::write(&path, "[controls]\ntime_step = \"noon\"").unwrap();
        assert!(load_config(Some(&path)).is_err());

        std::fs::write(&path, "[controls]\ntime_step = 10").unwrap();
        let (config, config_dir) = load_config(Some(&path)).unwrap();
        assert_eq!(config.controls.time_step, 10);
        assert_eq!(config_dir.as_deref(), Some(dir.path()));
    }
}
