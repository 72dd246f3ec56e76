//! Error types for soundview-geo
//!
//! ## Table of Contents
//! 1. GeoError - Main error enum
//! 2. Result type alias

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for lot loading operations
pub type Result<T> = std::result::Result<T, GeoError>;

/// Errors raised while reading, indexing or reprojecting lot polygons
#[derive(Error, Debug)]
pub enum GeoError {
    /// File I/O error
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Sidecar could not be written
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// GeoJSON parse error
    #[error("Failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// Shapefile record decoding error
    #[error("Failed to decode shapefile {}: {source}", path.display())]
    Shapefile {
        path: PathBuf,
        #[source]
        source: shapefile::Error,
    },

    /// The `.shx` index is missing and restoring it is disabled
    #[error("Missing spatial index {} (restore_missing_spatial_index is off)", path.display())]
    MissingIndex { path: PathBuf },

    /// `.shp` bytes do not follow the ESRI layout
    #[error("Corrupt shapefile {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    /// File extension is not a known vector format
    #[error("Unsupported vector format '{extension}' for {}", path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// CRS definition could not be parsed
    #[error("Invalid CRS definition: {0}")]
    InvalidCrs(String),

    /// CRS parsed but no transform to WGS84 is available for it
    #[error("Unsupported CRS '{0}' (enable the proj-transforms feature for arbitrary CRS)")]
    UnsupportedCrs(String),

    /// Coordinate transform failed for a specific vertex
    #[error("Coordinate transform failed: {0}")]
    Transform(String),
}
