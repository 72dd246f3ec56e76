//! # Lot Loading
//!
//! The boundary between lot data on disk and the mitigation engine. Every
//! failure below this point is typed (`GeoError`); at this boundary it is
//! downgraded to `LotLoadOutcome::Unavailable`, which callers treat as an
//! empty polygon set.
//!
//! ## Table of Contents
//! 1. LoaderOptions — Explicit loader configuration
//! 2. LotLoadOutcome — Loaded vs Unavailable
//! 3. load_lots — Main entry point

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::coords::Reprojector;
use crate::error::{GeoError, Result};
use crate::shx;
use crate::vector_import::{import_geojson, import_shapefile, MitigationPolygon};

// ============================================================================
// 1. LoaderOptions — Explicit loader configuration
// ============================================================================

/// Options passed into every load call. Nothing here is read from the
/// process environment, so concurrent sessions cannot interfere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderOptions {
    /// Rebuild a missing `.shx` index from the `.shp` records
    #[serde(default = "default_true")]
    pub restore_missing_spatial_index: bool,
    /// CRS of the source data (`EPSG:<code>` or WKT). Overrides the `.prj`
    /// sidecar when set.
    #[serde(default)]
    pub source_crs: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            restore_missing_spatial_index: true,
            source_crs: None,
        }
    }
}

// ============================================================================
// 2. LotLoadOutcome — Loaded vs Unavailable
// ============================================================================

/// Why lot data could not be used
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnavailableReason {
    /// No file at the configured path
    Missing(PathBuf),
    /// The file exists but could not be read, decoded or reprojected
    Failed { path: PathBuf, cause: String },
}

impl std::fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnavailableReason::Missing(path) => write!(f, "{} not found", path.display()),
            UnavailableReason::Failed { cause, .. } => f.write_str(cause),
        }
    }
}

/// Result of a lot load, never an error
#[derive(Debug, Clone, PartialEq)]
pub enum LotLoadOutcome {
    Loaded(Vec<MitigationPolygon>),
    Unavailable(UnavailableReason),
}

impl LotLoadOutcome {
    /// Loaded polygons, or an empty slice when unavailable
    pub fn polygons(&self) -> &[MitigationPolygon] {
        match self {
            LotLoadOutcome::Loaded(lots) => lots,
            LotLoadOutcome::Unavailable(_) => &[],
        }
    }

    pub fn into_polygons(self) -> Vec<MitigationPolygon> {
        match self {
            LotLoadOutcome::Loaded(lots) => lots,
            LotLoadOutcome::Unavailable(_) => Vec::new(),
        }
    }

    /// Operator-facing warning, if any
    pub fn warning(&self) -> Option<String> {
        match self {
            LotLoadOutcome::Loaded(_) => None,
            LotLoadOutcome::Unavailable(reason) => Some(format!("Shapefile Error: {}", reason)),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, LotLoadOutcome::Loaded(_))
    }
}

// ============================================================================
// 3. load_lots — Main entry point
// ============================================================================

/// Load lot polygons from a `.shp` or `.geojson`/`.json` file into WGS84.
pub fn load_lots(path: &Path, options: &LoaderOptions) -> LotLoadOutcome {
    if !path.exists() {
        tracing::warn!("Lot dataset {} not found; mitigation disabled", path.display());
        return LotLoadOutcome::Unavailable(UnavailableReason::Missing(path.to_path_buf()));
    }

    match try_load_lots(path, options) {
        Ok(lots) => {
            tracing::info!("Loaded {} mitigation lots from {}", lots.len(), path.display());
            LotLoadOutcome::Loaded(lots)
        }
        Err(e) => {
            tracing::warn!("Lot dataset unavailable: {}", e);
            LotLoadOutcome::Unavailable(UnavailableReason::Failed {
                path: path.to_path_buf(),
                cause: e.to_string(),
            })
        }
    }
}

/// Typed variant of [`load_lots`] for callers that want the error
pub fn try_load_lots(path: &Path, options: &LoaderOptions) -> Result<Vec<MitigationPolygon>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "shp" => load_shapefile(path, options),
        "geojson" | "json" => {
            if let Some(crs) = &options.source_crs {
                let reprojector = Reprojector::from_definition(crs)?;
                if !reprojector.is_identity() {
                    tracing::warn!("Ignoring source_crs '{}' for GeoJSON (always WGS84)", crs);
                }
            }
            import_geojson(path)
        }
        _ => Err(GeoError::UnsupportedFormat {
            path: path.to_path_buf(),
            extension,
        }),
    }
}

fn load_shapefile(path: &Path, options: &LoaderOptions) -> Result<Vec<MitigationPolygon>> {
    let index = shx::index_path(path);
    if !index.is_file() {
        if !options.restore_missing_spatial_index {
            return Err(GeoError::MissingIndex { path: index });
        }
        // Records are read sequentially, so an index we cannot persist is
        // not fatal
        match shx::restore_index(path) {
            Ok(_) => {}
            Err(GeoError::Write { path: shx_path, source }) => tracing::warn!(
                "Could not write spatial index {} ({}); reading records without it",
                shx_path.display(),
                source
            ),
            Err(e) => return Err(e),
        }
    }

    let reprojector = resolve_reprojector(path, options)?;
    import_shapefile(path, &reprojector)
}

/// `source_crs` override, else the `.prj` sidecar, else WGS84 with a warning
fn resolve_reprojector(path: &Path, options: &LoaderOptions) -> Result<Reprojector> {
    if let Some(definition) = &options.source_crs {
        return Reprojector::from_definition(definition);
    }

    let prj = shx::sidecar_path(path, "prj");
    if prj.exists() {
        let wkt = std::fs::read_to_string(&prj).map_err(|source| GeoError::Io {
            path: prj.clone(),
            source,
        })?;
        return Reprojector::from_definition(&wkt);
    }

    tracing::warn!(
        "No .prj next to {}; assuming WGS84 longitude/latitude",
        path.display()
    );
    Ok(Reprojector::wgs84())
}
