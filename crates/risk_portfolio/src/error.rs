//! Portfolio analytics error types.

use risk_core::types::InsufficientDataError;
use thiserror::Error;

/// Errors from correlation matrix estimation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CorrelationError {
    /// Malformed input (missing series, length mismatch, bad decay factor).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Sample too small to estimate a correlation structure.
    #[error(transparent)]
    InsufficientData(#[from] InsufficientDataError),

    /// Matrix could not be brought to a valid state.
    #[error("Numerical instability: {0}")]
    Numerical(String),
}

/// Errors from portfolio optimisation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimizationError {
    /// The constraint set admits no feasible allocation.
    #[error("Infeasible constraint set: {0}")]
    Infeasible(String),

    /// Malformed input (asset/matrix mismatch, invalid bounds).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// NaN/Inf in the objective or its gradient.
    #[error("Numerical instability: {0}")]
    Numerical(String),
}

/// Errors from diversification and risk-decomposition analytics.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    /// Malformed input (missing weights or volatilities).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Degenerate covariance structure.
    #[error("Numerical instability: {0}")]
    Numerical(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = OptimizationError::Infeasible("minimum weights sum to 1.2".to_string());
        assert_eq!(
            format!("{}", err),
            "Infeasible constraint set: minimum weights sum to 1.2"
        );
    }

    #[test]
    fn test_insufficient_data_conversion() {
        let err: CorrelationError = InsufficientDataError { got: 1, need: 2 }.into();
        assert!(matches!(err, CorrelationError::InsufficientData(_)));
    }
}
