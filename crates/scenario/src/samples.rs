//! # Synthetic Flood Samples
//!
//! Draws the fixed-size set of sample points both scenarios are rendered
//! from. Positions are normal around the area center, base depths uniform
//! over the configured range.
//!
//! The sample set is generated once per distinct `SampleParams` and then
//! shared read-only (`Arc<SampleSet>`). Slider changes never touch it, so
//! both scenario views always show the same points.
//!
//! ## Table of Contents
//! 1. SamplePoint / SampleParams
//! 2. Generation
//! 3. SampleSet — Immutable generated set
//! 4. SampleCache — Lazily generated, keyed by every parameter

use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal, Uniform};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{Result, ScenarioError};

// ============================================================================
// 1. SamplePoint / SampleParams
// ============================================================================

/// One synthetic observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Un-adjusted flood depth magnitude
    pub base_depth: f64,
}

/// Everything that shapes the sample distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleParams {
    pub count: usize,
    pub center_lat: f64,
    pub center_lon: f64,
    /// Standard deviation of both coordinates, in degrees
    pub spread: f64,
    pub depth_min: f64,
    pub depth_max: f64,
    /// `None` draws from OS entropy
    pub seed: Option<u64>,
}

impl Default for SampleParams {
    fn default() -> Self {
        Self {
            count: 1200,
            center_lat: 40.8250,
            center_lon: -73.8700,
            spread: 0.007,
            depth_min: 2.0,
            depth_max: 12.0,
            seed: None,
        }
    }
}

impl SampleParams {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(ScenarioError::InvalidSampling(msg));

        if self.count == 0 {
            return invalid("count must be positive".to_string());
        }
        if !self.center_lat.is_finite() || !self.center_lon.is_finite() {
            return invalid(format!("center ({}, {}) is not finite", self.center_lat, self.center_lon));
        }
        if !self.spread.is_finite() || self.spread < 0.0 {
            return invalid(format!("spread {} must be finite and non-negative", self.spread));
        }
        if !self.depth_min.is_finite() || !self.depth_max.is_finite() || self.depth_min > self.depth_max {
            return invalid(format!(
                "depth range [{}, {}] is empty or not finite",
                self.depth_min, self.depth_max
            ));
        }
        if self.depth_min < 0.0 {
            return invalid(format!("depth_min {} must be non-negative", self.depth_min));
        }
        Ok(())
    }
}

// ============================================================================
// 2. Generation
// ============================================================================

/// Draw `params.count` points from `rng`
pub fn generate_with_rng<R: Rng + ?Sized>(params: &SampleParams, rng: &mut R) -> Result<Vec<SamplePoint>> {
    params.validate()?;

    let to_err = |e: rand_distr::NormalError| ScenarioError::InvalidSampling(e.to_string());
    let lat = Normal::new(params.center_lat, params.spread).map_err(to_err)?;
    let lon = Normal::new(params.center_lon, params.spread).map_err(to_err)?;
    // Half-open [min, max); a degenerate range is a constant depth
    let depth = (params.depth_min < params.depth_max)
        .then(|| Uniform::new(params.depth_min, params.depth_max));

    let points = (0..params.count)
        .map(|_| SamplePoint {
            latitude: lat.sample(rng),
            longitude: lon.sample(rng),
            base_depth: depth.map_or(params.depth_min, |d| d.sample(rng)),
        })
        .collect();
    Ok(points)
}

/// Unseeded generation: a different sample set on every call
pub fn generate_samples(
    count: usize,
    center_lat: f64,
    center_lon: f64,
    lat_lon_spread: f64,
    depth_range: (f64, f64),
) -> Result<Vec<SamplePoint>> {
    let params = SampleParams {
        count,
        center_lat,
        center_lon,
        spread: lat_lon_spread,
        depth_min: depth_range.0,
        depth_max: depth_range.1,
        seed: None,
    };
    generate_with_rng(&params, &mut rand::thread_rng())
}

// ============================================================================
// 3. SampleSet — Immutable generated set
// ============================================================================

/// A generated sample set together with the parameters that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSet {
    params: SampleParams,
    points: Vec<SamplePoint>,
}

impl SampleSet {
    /// Generate from params, honouring `params.seed`
    pub fn generate(params: SampleParams) -> Result<Self> {
        let points = match params.seed {
            Some(seed) => generate_with_rng(&params, &mut ChaCha8Rng::seed_from_u64(seed))?,
            None => generate_with_rng(&params, &mut rand::thread_rng())?,
        };
        tracing::info!(
            "Generated {} flood samples around ({:.4}, {:.4})",
            points.len(),
            params.center_lat,
            params.center_lon
        );
        Ok(Self { params, points })
    }

    /// Wrap externally produced points (fixtures, replays)
    pub fn from_points(params: SampleParams, points: Vec<SamplePoint>) -> Self {
        Self { params, points }
    }

    pub fn params(&self) -> &SampleParams {
        &self.params
    }

    pub fn points(&self) -> &[SamplePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

// ============================================================================
// 4. SampleCache — Lazily generated, keyed by every parameter
// ============================================================================

/// Sample sets kept by `SampleCache::new`
pub const DEFAULT_CACHE_CAPACITY: usize = 8;

/// Owned memo of generated sample sets. The key is the full `SampleParams`,
/// so a change to any distribution parameter yields a new set, while control
/// changes (which are not part of the key) always reuse the existing one.
///
/// At most `capacity` sets are kept; the least recently used one is evicted
/// first. Sessions holding an evicted `Arc<SampleSet>` keep their copy.
#[derive(Debug)]
pub struct SampleCache {
    capacity: usize,
    /// Least recently used first
    entries: Mutex<Vec<(SampleParams, Arc<SampleSet>)>>,
}

impl Default for SampleCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl SampleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache keeping at most `capacity` sets (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Return the cached set for `params`, generating it on first use
    pub fn get_or_generate(&self, params: &SampleParams) -> Result<Arc<SampleSet>> {
        let mut entries = self.entries.lock();
        if let Some(pos) = entries.iter().position(|(key, _)| key == params) {
            let entry = entries.remove(pos);
            let set = Arc::clone(&entry.1);
            entries.push(entry);
            return Ok(set);
        }

        let set = Arc::new(SampleSet::generate(params.clone())?);
        if entries.len() >= self.capacity {
            let (evicted, _) = entries.remove(0);
            tracing::debug!("Evicting sample set for {:?}", evicted);
        }
        entries.push((params.clone(), Arc::clone(&set)));
        Ok(set)
    }

    /// Number of distinct parameter sets generated so far
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
