//! Error types for feature preparation, training and explanation.

use claimcost_data::DataError;
use thiserror::Error;

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors that can occur while preparing features, fitting or loading a model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Data layer error
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Artifact (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Not enough rows for the requested operation
    #[error("Insufficient data: need at least {required} rows, got {actual}")]
    InsufficientData {
        /// Required number of rows
        required: usize,
        /// Actual number of rows
        actual: usize,
    },

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// A feature the fitted preprocessor needs is absent from the input
    #[error("Missing feature column `{0}`")]
    MissingFeature(String),

    /// A feature column has a different kind than at fit time
    #[error("Feature `{column}` was {expected} at fit time but is {actual}")]
    FeatureKindMismatch {
        /// Column name
        column: String,
        /// Kind recorded at fit time
        expected: String,
        /// Kind observed now
        actual: String,
    },

    /// Nothing left to train on after exclusions
    #[error("No feature columns remain after excluding {excluded} column(s)")]
    NoFeatures {
        /// Number of excluded columns
        excluded: usize,
    },

    /// Non-finite target values
    #[error("Target contains {0} non-finite value(s)")]
    NonFiniteTarget(usize),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Artifact was written by an incompatible format version
    #[error("Unsupported model format version {found} (expected {expected})")]
    UnsupportedFormat {
        /// Version found in the artifact
        found: u32,
        /// Version this build reads
        expected: u32,
    },
}
