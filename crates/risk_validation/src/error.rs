//! Validation error types.

use risk_core::types::InsufficientDataError;
use thiserror::Error;

/// Errors from validation tests and backtesting.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Malformed input (length mismatch, bad lag count).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Sample below the test's minimum size.
    #[error(transparent)]
    InsufficientData(#[from] InsufficientDataError),

    /// Degenerate sample (e.g. zero variance) or distribution failure.
    #[error("Numerical instability: {0}")]
    Numerical(String),
}
