//! Error types for structured error handling.
//!
//! This module provides:
//! - `SolverError`: Errors from root-finding solvers
//! - `InsufficientDataError`: Sample size below a routine's minimum
//!
//! Higher layers define their own error enums and convert from these at the
//! crate seam via `From`.

use thiserror::Error;

/// Root-finding solver errors.
///
/// Provides structured error handling for root-finding operations with
/// descriptive context for each failure mode.
///
/// # Variants
/// - `MaxIterationsExceeded`: Solver failed to converge within iteration limit
/// - `NoBracket`: Function values at bracket endpoints have same sign
/// - `NumericalInstability`: NaN/Inf encountered during iteration
///
/// # Examples
/// ```
/// use risk_core::types::SolverError;
///
/// let err = SolverError::MaxIterationsExceeded { iterations: 100 };
/// assert!(format!("{}", err).contains("100 iterations"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// Solver failed to converge within maximum iterations.
    #[error("Failed to converge after {iterations} iterations")]
    MaxIterationsExceeded {
        /// Number of iterations attempted
        iterations: usize,
    },

    /// No valid bracket (function values at endpoints have same sign).
    #[error("No bracket: f({a}) and f({b}) have same sign")]
    NoBracket {
        /// Left bracket endpoint
        a: f64,
        /// Right bracket endpoint
        b: f64,
    },

    /// Numerical instability during computation.
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),
}

/// Sample size below the minimum a statistical routine requires.
///
/// Carries both the observed and required counts so callers can report a
/// precise diagnostic instead of a generic "not enough data".
///
/// # Examples
/// ```
/// use risk_core::types::InsufficientDataError;
///
/// let err = InsufficientDataError { got: 3, need: 30 };
/// assert!(format!("{}", err).contains("need at least 30"));
/// ```
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Insufficient data: got {got} observations, need at least {need}")]
pub struct InsufficientDataError {
    /// Number of observations provided.
    pub got: usize,
    /// Minimum number of observations required.
    pub need: usize,
}
