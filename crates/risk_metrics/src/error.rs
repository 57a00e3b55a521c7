//! Metric calculation error types.

use risk_core::types::InsufficientDataError;
use thiserror::Error;

/// Errors from risk metric calculations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricsError {
    /// Malformed input (mismatched lengths, invalid level set).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Sample too small for the requested statistic.
    #[error(transparent)]
    InsufficientData(#[from] InsufficientDataError),

    /// Underlying distribution or numeric failure.
    #[error("Numerical instability: {0}")]
    Numerical(String),
}
