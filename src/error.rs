//! Error types for engagement-insights
//!
//! Per-record problems never surface here: they are filtered and logged.
//! Everything below is a per-dimension, per-pair or load-time failure.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Engagement-insights error types
#[derive(Error, Debug)]
pub enum Error {
    /// Requested grouping or metric field is not part of the dataset schema
    #[error("Unknown field: {0}\nDeclare it in the DatasetSchema before querying it")]
    UnknownDimension(String),

    /// Aggregation over a dimension with zero valid records
    #[error("No valid records to aggregate for dimension '{dimension}'")]
    EmptyGroup {
        /// Dimension that produced no groups
        dimension: String,
    },

    /// Correlation requested for a pair without enough paired observations
    #[error(
        "Insufficient data to correlate '{metric_a}' with '{metric_b}': \
         {observations} paired observation(s), need at least 2 with non-zero variance"
    )]
    InsufficientData {
        /// First metric of the pair
        metric_a: String,
        /// Second metric of the pair
        metric_b: String,
        /// Number of valid paired observations
        observations: usize,
    },

    /// Source data does not match the declared schema
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Invalid argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error (CSV/Parquet)
    #[error("Storage error: {0}")]
    StorageError(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
