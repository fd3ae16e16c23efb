//! Error types for data operations.

use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur while loading raw tables or building the ABT.
#[derive(Debug, Error)]
pub enum DataError {
    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A column the stage cannot run without is absent
    #[error("Missing required column `{column}` in {table}")]
    MissingColumn {
        /// Table that was inspected
        table: String,
        /// Name of the absent column
        column: String,
    },

    /// Join key is not unique on the side expected to be unique
    #[error("Join key `{key}` is not unique in {table}: {duplicates} duplicate row(s)")]
    CardinalityViolation {
        /// Table expected to be keyed uniquely
        table: String,
        /// Join key column
        key: String,
        /// Number of rows beyond the first per key
        duplicates: usize,
    },

    /// A date cell could not be parsed
    #[error("Invalid date `{value}` in column `{column}`")]
    InvalidDate {
        /// Column holding the value
        column: String,
        /// The raw cell content
        value: String,
    },

    /// Column has a dtype the operation cannot work with
    #[error("Unexpected dtype for column `{column}`: {dtype}")]
    UnexpectedDtype {
        /// Column name
        column: String,
        /// Observed dtype
        dtype: String,
    },

    /// Rows without a target reached a stage that requires one
    #[error("{rows} row(s) have a null target")]
    NullTarget {
        /// Number of offending rows
        rows: usize,
    },
}
