//! # Soundview Geo — File-System-First Lot Polygons
//!
//! Loads vacant/parking lot polygons from local files, brings them into
//! WGS84 longitude/latitude and answers point-in-lot queries. No database,
//! no GDAL, no environment flags.
//!
//! ## Modules
//! - `coords` — CRS resolution and inverse projections to WGS84
//! - `wkt` — `.prj` well-known-text reader
//! - `shx` — Restore a missing shapefile index sidecar
//! - `vector_import` — GeoJSON/shapefile → `MitigationPolygon`
//! - `lots` — Loader boundary (`LotLoadOutcome`)
//! - `spatial_index` — R-tree wrapper for containment queries
//!
//! ## Table of Contents
//! 1. Module declarations
//! 2. Re-exports

pub mod coords;
pub mod error;
pub mod lots;
pub mod shx;
pub mod spatial_index;
pub mod vector_import;
pub mod wkt;

#[cfg(test)]
pub(crate) mod test_support;

pub use coords::Reprojector;
pub use error::{GeoError, Result};
pub use lots::{load_lots, try_load_lots, LoaderOptions, LotLoadOutcome, UnavailableReason};
pub use spatial_index::LotIndex;
pub use vector_import::MitigationPolygon;
