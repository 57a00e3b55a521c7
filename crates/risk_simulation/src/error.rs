//! Simulation error types.

use thiserror::Error;

/// Errors from Monte Carlo simulation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// Invalid or out-of-range simulation parameter.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Correlation matrix failed validation or factorisation.
    #[error("Invalid correlation matrix: {0}")]
    InvalidCorrelation(String),

    /// NaN/Inf propagation or other numerical failure.
    #[error("Numerical instability: {0}")]
    Numerical(String),

    /// The caller's cancellation token was tripped between path batches.
    #[error("Simulation cancelled")]
    Cancelled,
}
