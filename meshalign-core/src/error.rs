//! Error types for meshalign

use thiserror::Error;

/// Main error type for meshalign operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient landmarks: source has {source_count}, target has {target_count} (need at least 3 matched pairs)")]
    InsufficientLandmarks { source_count: usize, target_count: usize },

    #[error("Numerical degeneracy: {0}")]
    NumericalDegeneracy(String),

    #[error("Iteration limit exceeded after {iterations} iterations (mean distance {mean_distance})")]
    IterationLimitExceeded { iterations: usize, mean_distance: f32 },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Result type alias for meshalign operations
pub type Result<T> = std::result::Result<T, Error>;
