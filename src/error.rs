//! Error types for bootstrap resampling and quantile estimation.

use thiserror::Error;

/// Errors arising from bootstrap resampling and quantile estimation.
///
/// All errors are synchronous and unrecoverable at the point of detection.
/// Resampling correctness depends on deterministic, complete index
/// structures, so no failure is retried internally.
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// An argument or precondition violation by the caller.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The supplied data cannot support bootstrap resampling, for example
    /// because cross-pairing removed all overlapping events.
    #[error("insufficient data for resampling: {0}")]
    InsufficientData(String),

    /// A failure encountered while generating or applying resample indexes.
    #[error("encountered an error while attempting to resample: {0}")]
    Resampling(String),
}

/// Result type alias for bootstrap operations.
pub type Result<T> = std::result::Result<T, BootstrapError>;
