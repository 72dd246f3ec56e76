//! Error types for soundview-scenario
//!
//! ## Table of Contents
//! 1. ScenarioError - Main error enum
//! 2. Result type alias

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for scenario operations
pub type Result<T> = std::result::Result<T, ScenarioError>;

/// Errors that can occur while configuring or driving a scenario
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// A control value outside its documented domain
    #[error("{name} = {value} is outside [{min}, {max}]")]
    InputOutOfRange {
        name: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    /// Sample generator parameters that cannot describe a distribution
    #[error("Invalid sampling parameters: {0}")]
    InvalidSampling(String),

    /// Config file could not be read
    #[error("Failed to read {}: {source}", path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for `DashboardConfig`
    #[error("Failed to parse {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ScenarioError {
    fn from(err: serde_json::Error) -> Self {
        ScenarioError::Serialization(err.to_string())
    }
}
