//! Brent's method root-finding solver.

use super::SolverConfig;
use crate::types::SolverError;

/// Brent's method root finder.
///
/// Combines bisection, secant, and inverse quadratic interpolation for
/// robust root finding without requiring derivatives. Converges for any
/// continuous function given a valid bracket, falling back to bisection
/// whenever an interpolation step would be unreliable.
///
/// # Example
///
/// ```
/// use risk_core::math::solvers::{BrentSolver, SolverConfig};
///
/// let solver = BrentSolver::new(SolverConfig::default());
///
/// // Solve x³ - x - 2 = 0 in bracket [1, 2]
/// let f = |x: f64| x * x * x - x - 2.0;
///
/// let root = solver.find_root(f, 1.0, 2.0).unwrap();
/// assert!(f(root).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct BrentSolver {
    /// Solver configuration
    config: SolverConfig,
}

impl BrentSolver {
    /// Create a new Brent solver with the given configuration.
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Create a solver with default configuration.
    pub fn with_defaults() -> Self {
        Self {
            config: SolverConfig::default(),
        }
    }

    /// Find a root of `f` in the bracket `[a, b]`.
    ///
    /// Requires that `f(a)` and `f(b)` have opposite signs.
    ///
    /// # Errors
    ///
    /// * [`SolverError::NoBracket`] — `f(a)` and `f(b)` have the same sign
    /// * [`SolverError::MaxIterationsExceeded`] — failed to converge
    /// * [`SolverError::NumericalInstability`] — `f` produced a non-finite value
    pub fn find_root<F>(&self, f: F, a: f64, b: f64) -> Result<f64, SolverError>
    where
        F: Fn(f64) -> f64,
    {
        let mut a = a;
        let mut b = b;
        let mut fa = f(a);
        let mut fb = f(b);

        if !fa.is_finite() || !fb.is_finite() {
            return Err(SolverError::NumericalInstability(format!(
                "non-finite function value at bracket endpoint: f({}) = {}, f({}) = {}",
                a, fa, b, fb
            )));
        }

        if fa * fb > 0.0 {
            return Err(SolverError::NoBracket { a, b });
        }

        // Keep |f(a)| >= |f(b)| so b is the best estimate
        if fa.abs() < fb.abs() {
            std::mem::swap(&mut a, &mut b);
            std::mem::swap(&mut fa, &mut fb);
        }

        let mut c = a;
        let mut fc = fa;
        let mut d = b - a;
        let mut e = d;

        let tol = self.config.tolerance;

        for _ in 0..self.config.max_iterations {
            if fb.abs() < tol {
                return Ok(b);
            }

            let m = (c - b) / 2.0;
            if m.abs() <= tol {
                return Ok(b);
            }

            let use_bisection;
            if fa != fc && fb != fc {
                // Inverse quadratic interpolation
                let r = fb / fc;
                let s = fb / fa;
                let t = fa / fc;

                let p = s * (t * (r - t) * (c - b) - (1.0 - r) * (b - a));
                let q = (t - 1.0) * (r - 1.0) * (s - 1.0);

                if p.abs() < (3.0 * m * q).abs() / 2.0 && p.abs() < (e * q).abs() / 2.0 {
                    e = d;
                    d = p / q;
                    use_bisection = false;
                } else {
                    use_bisection = true;
                }
            } else if fb != fa {
                // Secant method
                let s = fb / fa;
                let p = 2.0 * m * s;
                let q = 1.0 - s;

                if p.abs() < (3.0 * m * q).abs() / 2.0 && p.abs() < (e * q).abs() / 2.0 {
                    e = d;
                    d = p / q;
                    use_bisection = false;
                } else {
                    use_bisection = true;
                }
            } else {
                use_bisection = true;
            }

            if use_bisection {
                d = m;
                e = m;
            }

            a = b;
            fa = fb;

            if d.abs() > tol {
                b += d;
            } else {
                b += if m > 0.0 { tol } else { -tol };
            }

            fb = f(b);
            if !fb.is_finite() {
                return Err(SolverError::NumericalInstability(format!(
                    "non-finite function value at x = {}",
                    b
                )));
            }

            // Re-establish a valid bracket between b and c
            if (fb > 0.0 && fc > 0.0) || (fb < 0.0 && fc < 0.0) {
                c = a;
                fc = fa;
                d = b - a;
                e = d;
            }

            if fc.abs() < fb.abs() {
                a = b;
                b = c;
                c = a;
                fa = fb;
                fb = fc;
                fc = fa;
            }
        }

        Err(SolverError::MaxIterationsExceeded {
            iterations: self.config.max_iterations,
        })
    }

    /// Returns a reference to the solver configuration.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_sqrt_2() {
        let solver = BrentSolver::with_defaults();
        let f = |x: f64| x * x - 2.0;

        let root = solver.find_root(f, 0.0, 2.0).unwrap();
        assert!(
            (root - std::f64::consts::SQRT_2).abs() < 1e-9,
            "expected sqrt(2), got {}",
            root
        );
    }

    #[test]
    fn test_find_cubic_root() {
        let solver = BrentSolver::with_defaults();
        let f = |x: f64| x * x * x - x - 2.0;

        let root = solver.find_root(f, 1.0, 2.0).unwrap();
        assert!(f(root).abs() < 1e-9);
    }

    #[test]
    fn test_find_sin_root() {
        let solver = BrentSolver::with_defaults();
        let f = |x: f64| x.sin();

        let root = solver.find_root(f, 3.0, 4.0).unwrap();
        assert!((root - std::f64::consts::PI).abs() < 1e-9);
    }

    #[test]
    fn test_bracket_reversed() {
        let solver = BrentSolver::with_defaults();
        let f = |x: f64| x * x - 2.0;

        let root = solver.find_root(f, 2.0, 0.0).unwrap();
        assert!((root - std::f64::consts::SQRT_2).abs() < 1e-9);
    }

    #[test]
    fn test_no_bracket_same_sign() {
        let solver = BrentSolver::with_defaults();
        let f = |x: f64| x * x + 1.0;

        let result = solver.find_root(f, -1.0, 1.0);
        assert!(matches!(result, Err(SolverError::NoBracket { .. })));
    }

    #[test]
    fn test_max_iterations_exceeded() {
        let solver = BrentSolver::new(SolverConfig::new(1e-300, 3));
        let f = |x: f64| x * x - 2.0;

        let result = solver.find_root(f, 0.0, 2.0);
        assert!(matches!(
            result,
            Err(SolverError::MaxIterationsExceeded { iterations: 3 })
        ));
    }

    #[test]
    fn test_non_finite_function_value() {
        let solver = BrentSolver::with_defaults();
        let f = |x: f64| if x > 0.5 { f64::NAN } else { x - 1.0 };

        let result = solver.find_root(f, 0.0, 1.0);
        assert!(matches!(
            result,
            Err(SolverError::NumericalInstability(_))
        ));
    }

    #[test]
    fn test_root_at_endpoint() {
        let solver = BrentSolver::with_defaults();
        let f = |x: f64| x - 1.0;

        let root = solver.find_root(f, 0.0, 1.0).unwrap();
        assert!((root - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_achieves_tolerance() {
        let tol = 1e-12;
        let solver = BrentSolver::new(SolverConfig::new(tol, 100));
        let f = |x: f64| x.exp() - 2.0;

        let root = solver.find_root(f, 0.0, 1.0).unwrap();
        assert!(f(root).abs() < tol);
    }

    #[test]
    fn test_config_accessor() {
        let solver = BrentSolver::new(SolverConfig::new(1e-8, 50));
        assert_eq!(solver.config().max_iterations, 50);
    }
}
