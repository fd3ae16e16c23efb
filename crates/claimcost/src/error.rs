//! Error type for the staged pipeline.

use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that abort a pipeline stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Dataset build or ABT I/O failed.
    #[error(transparent)]
    Data(#[from] claimcost_data::DataError),

    /// Training, persistence or attribution failed.
    #[error(transparent)]
    Model(#[from] claimcost_model::ModelError),

    /// Report, plot or export failed.
    #[error(transparent)]
    Output(#[from] claimcost_output::OutputError),

    /// Configuration file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file is not valid JSON for [`crate::PipelineConfig`].
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}
