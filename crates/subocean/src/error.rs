//! Error types for the SubOcean processing library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for SubOcean operations.
///
/// Structural errors (malformed raw file, missing pressure/depth channels)
/// are fatal to the profile that produced them; the batch orchestrator
/// catches them per profile and continues. Numeric edge cases (zero
/// denominators, missing values) never surface here; they propagate as NaN.
#[derive(Debug, Error)]
pub enum SuboceanError {
    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed raw profile data.
    #[error("Parse error in '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    /// Metadata sidecar missing a required key or holding an uncoercible value.
    #[error("Metadata error for key '{key}': {message}")]
    Metadata { key: String, message: String },

    /// Cast segmentation cannot run (pressure/depth channel absent).
    #[error("Segmentation error: {0}")]
    Segmentation(String),

    /// Depth gridding cannot run (depth channel absent or degenerate range).
    #[error("Grid error: {0}")]
    Grid(String),

    /// A derived calculation was invoked before its prerequisite fields existed.
    #[error("Missing flow fields: {0}")]
    MissingFlows(String),

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Plot-code provider failure.
    #[error("Provider error: {0}")]
    Provider(String),
}

/// Result type alias for SubOcean operations.
pub type Result<T> = std::result::Result<T, SuboceanError>;
