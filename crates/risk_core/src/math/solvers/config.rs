//! Solver configuration.

use serde::{Deserialize, Serialize};

/// Configuration for iterative root-finding solvers.
///
/// # Examples
/// ```
/// use risk_core::math::solvers::SolverConfig;
///
/// let config = SolverConfig::new(1e-8, 50);
/// assert_eq!(config.max_iterations, 50);
///
/// let default = SolverConfig::default();
/// assert_eq!(default.max_iterations, 100);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Convergence tolerance on `|f(x)|` and the bracket width.
    pub tolerance: f64,
    /// Maximum number of iterations before giving up.
    pub max_iterations: usize,
}

impl SolverConfig {
    /// Create a new solver configuration.
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
        }
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = SolverConfig::default();
        assert_eq!(config.tolerance, 1e-10);
        assert_eq!(config.max_iterations, 100);
    }

    #[test]
    fn test_new() {
        let config = SolverConfig::new(1e-6, 25);
        assert_eq!(config.tolerance, 1e-6);
        assert_eq!(config.max_iterations, 25);
    }
}
