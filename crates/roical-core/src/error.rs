//! Error types for the ROI calibration toolkit.

use thiserror::Error;

/// Calibration error type.
///
/// Failures scoped to a single (region, stage), such as degenerate binning
/// or a failed fit, are recoverable: the pipeline records them and continues
/// with the remaining regions. A schema mismatch is fatal for the whole
/// dataset.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required input column is absent from the event table.
    #[error("schema mismatch: missing column '{column}'")]
    SchemaMismatch {
        /// Name of the missing column.
        column: String,
    },

    /// Quantile edges collapsed below a single usable bin.
    #[error("degenerate binning: {0}")]
    BinningDegenerate(String),

    /// A polynomial fit failed for one region and stage.
    #[error("fit failure ({region}, {stage}): {reason}")]
    FitFailure {
        /// Signal-region label.
        region: String,
        /// Calibration-stage label.
        stage: String,
        /// What went wrong.
        reason: String,
    },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
