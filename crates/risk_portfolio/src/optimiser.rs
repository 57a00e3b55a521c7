//! Constrained portfolio optimisation.
//!
//! Solves a constrained nonlinear program over portfolio weights:
//! objectives are maximise Sharpe, minimise variance, maximise return, and
//! risk parity, subject to per-asset weight bounds, the weights-sum-to-one
//! equality, and optional target-return, turnover, and variance
//! constraints.
//!
//! The solver is projected gradient descent with a backtracking line
//! search: the bound-and-sum feasible set `{sum w = 1, l <= w <= u}` is
//! handled exactly by projection (bisection on the simplex shift), the
//! remaining constraints by quadratic penalties with an escalating weight.
//! Convergence status is reported distinctly from the returned allocation;
//! an unconverged iterate is returned only together with an explicit
//! warning.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::correlation::CorrelationMatrix;
use crate::error::OptimizationError;

/// Tolerance on the weight-sum invariant of a returned allocation.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;
/// Residual beyond which a penalised constraint is reported violated.
const TARGET_RETURN_TOLERANCE: f64 = 1e-4;
/// Outer rounds of penalty escalation before giving up on a constraint.
const PENALTY_ROUNDS: usize = 3;

/// Parameters of a single asset available to the optimiser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetParameters {
    /// Asset identifier; must match the correlation matrix ordering keys.
    pub asset_id: String,
    /// Expected (periodic) return.
    pub expected_return: f64,
    /// Return volatility (>= 0).
    pub volatility: f64,
    /// Current allocation, used for turnover and transaction costs.
    pub current_weight: f64,
    /// Default lower weight bound.
    pub min_weight: f64,
    /// Default upper weight bound.
    pub max_weight: f64,
    /// Optional sector label for concentration diagnostics.
    pub sector: Option<String>,
    /// Proportional transaction cost on traded weight.
    pub transaction_cost: f64,
}

impl AssetParameters {
    /// Create an asset with `[0, 1]` bounds, zero current weight, and a
    /// 10bp transaction cost.
    pub fn new(asset_id: impl Into<String>, expected_return: f64, volatility: f64) -> Self {
        Self {
            asset_id: asset_id.into(),
            expected_return,
            volatility,
            current_weight: 0.0,
            min_weight: 0.0,
            max_weight: 1.0,
            sector: None,
            transaction_cost: 0.001,
        }
    }

    /// Set the weight bounds.
    pub fn with_bounds(mut self, min_weight: f64, max_weight: f64) -> Self {
        self.min_weight = min_weight;
        self.max_weight = max_weight;
        self
    }

    /// Set the current allocation.
    pub fn with_current_weight(mut self, weight: f64) -> Self {
        self.current_weight = weight;
        self
    }

    /// Set the sector label.
    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }
}

/// Portfolio optimisation objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationObjective {
    /// Maximise `(return - risk_free) / volatility`.
    MaximizeSharpe,
    /// Minimise portfolio variance.
    MinimizeVariance,
    /// Maximise expected return.
    MaximizeReturn,
    /// Equalise per-asset risk contributions.
    RiskParity,
}

/// Optional constraints beyond weight bounds and the sum-to-one equality.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OptimizationConstraints {
    /// Per-asset lower bound overrides.
    pub min_weights: BTreeMap<String, f64>,
    /// Per-asset upper bound overrides.
    pub max_weights: BTreeMap<String, f64>,
    /// Total-weight bounds `(min, max)` per sector label.
    pub sector_limits: BTreeMap<String, (f64, f64)>,
    /// Required expected portfolio return (equality).
    pub target_return: Option<f64>,
    /// Cap on total turnover `sum |w - w_current|`.
    pub turnover_limit: Option<f64>,
    /// Cap on portfolio variance.
    pub max_variance: Option<f64>,
}

/// A sector limit resolved to asset indices.
#[derive(Debug, Clone)]
struct SectorBound {
    name: String,
    indices: Vec<usize>,
    min: f64,
    max: f64,
}

/// Solver termination status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverStatus {
    /// Step size fell below tolerance.
    Converged,
    /// Iteration budget exhausted before convergence.
    MaxIterationsExceeded,
}

/// Explicit record of a solver shortfall attached to a returned allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum OptimizationWarning {
    /// The solver stopped on its iteration budget.
    NotConverged {
        /// Iterations performed.
        iterations: usize,
    },
    /// A penalised constraint is still violated at the returned point.
    ConstraintViolated {
        /// Which constraint, e.g. `"target_return"`.
        constraint: String,
        /// Magnitude of the violation.
        residual: f64,
    },
    /// A reported ratio defaulted to 0 on a zero denominator.
    ZeroDenominator {
        /// Which metric was defaulted.
        metric: String,
    },
}

/// An optimised portfolio allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioAllocation {
    /// Optimised weights per asset. Sum to 1 within `1e-6`.
    pub weights: BTreeMap<String, f64>,
    /// Objective the weights were optimised for.
    pub objective: OptimizationObjective,
    /// Expected portfolio return at the optimum.
    pub expected_return: f64,
    /// Portfolio volatility at the optimum.
    pub expected_volatility: f64,
    /// Sharpe ratio at the optimum.
    pub sharpe_ratio: f64,
    /// Value of the chosen objective at the optimum.
    pub objective_value: f64,
    /// Solver termination status.
    pub status: SolverStatus,
    /// Iterations performed.
    pub iterations: usize,
    /// Total traded weight against the current allocation.
    pub turnover: f64,
    /// Proportional transaction costs of the rebalance.
    pub transaction_costs: f64,
    /// Solver shortfalls, if any. Empty means a clean solve.
    pub warnings: Vec<OptimizationWarning>,
}

/// A point on the efficient frontier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrontierPoint {
    /// Portfolio volatility.
    pub expected_volatility: f64,
    /// Portfolio expected return.
    pub expected_return: f64,
}

/// Portfolio optimiser.
///
/// Holds solver configuration only; each call is a pure function of its
/// inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioOptimiser {
    /// Risk-free rate used by the Sharpe objective.
    pub risk_free_rate: f64,
    /// Iteration budget for the projected-gradient loop.
    pub max_iterations: usize,
    /// Step-size tolerance for convergence.
    pub tolerance: f64,
}

impl Default for PortfolioOptimiser {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.02,
            max_iterations: 1000,
            tolerance: 1e-9,
        }
    }
}

impl PortfolioOptimiser {
    /// Create an optimiser with the given risk-free rate and default
    /// iteration budget.
    pub fn new(risk_free_rate: f64) -> Self {
        Self {
            risk_free_rate,
            ..Self::default()
        }
    }

    /// Optimise portfolio weights for the given objective and constraints.
    ///
    /// # Errors
    ///
    /// - [`OptimizationError::InvalidInput`] if the asset list is empty,
    ///   does not match the correlation matrix identifiers, or carries a
    ///   negative volatility
    /// - [`OptimizationError::Infeasible`] if the bound set cannot sum to 1
    /// - [`OptimizationError::Numerical`] on NaN/Inf in the objective
    pub fn optimise(
        &self,
        assets: &[AssetParameters],
        correlation: &CorrelationMatrix,
        objective: OptimizationObjective,
        constraints: &OptimizationConstraints,
    ) -> Result<PortfolioAllocation, OptimizationError> {
        let ordered = order_assets(assets, correlation)?;
        let n = ordered.len();

        let expected_returns =
            DVector::from_iterator(n, ordered.iter().map(|a| a.expected_return));
        let volatilities: Vec<f64> = ordered.iter().map(|a| a.volatility).collect();
        if let Some(&bad) = volatilities.iter().find(|&&v| !v.is_finite() || v < 0.0) {
            return Err(OptimizationError::InvalidInput(format!(
                "volatilities must be non-negative and finite, got {}",
                bad
            )));
        }
        let covariance = correlation
            .covariance(&volatilities)
            .map_err(|e| OptimizationError::InvalidInput(e.to_string()))?;

        let current = DVector::from_iterator(n, ordered.iter().map(|a| a.current_weight));
        let (lower, upper) = resolve_bounds(&ordered, constraints)?;
        let sector_bounds = resolve_sector_bounds(&ordered, constraints)?;

        debug!(
            assets = n,
            ?objective,
            "optimising portfolio"
        );

        // Start from the current allocation when it is close to fully
        // invested, otherwise equal weights; either way project to the
        // feasible set first.
        let start = if (current.sum() - 1.0).abs() <= 0.01 {
            current.clone()
        } else {
            DVector::from_element(n, 1.0 / n as f64)
        };
        let mut x = project_to_simplex(&start, &lower, &upper);

        let mut penalty_weight = 1e4;
        let mut status = SolverStatus::Converged;
        let mut total_iterations = 0;

        for round in 0..PENALTY_ROUNDS {
            let objective_fn = |w: &DVector<f64>| {
                base_objective(
                    w,
                    &expected_returns,
                    &covariance,
                    objective,
                    self.risk_free_rate,
                ) + penalty(
                    w,
                    &expected_returns,
                    &covariance,
                    &current,
                    constraints,
                    &sector_bounds,
                ) * penalty_weight
            };

            let (solution, solve_status, iterations) =
                self.descend(x, &lower, &upper, &objective_fn)?;
            x = solution;
            status = solve_status;
            total_iterations += iterations;

            if !constraints_violated(
                &x,
                &expected_returns,
                &covariance,
                &current,
                constraints,
                &sector_bounds,
            ) {
                break;
            }
            if round + 1 < PENALTY_ROUNDS {
                penalty_weight *= 100.0;
            }
        }

        let mut warnings = Vec::new();
        if status == SolverStatus::MaxIterationsExceeded {
            warn!(iterations = total_iterations, "optimiser did not converge");
            warnings.push(OptimizationWarning::NotConverged {
                iterations: total_iterations,
            });
        }
        collect_constraint_warnings(
            &x,
            &expected_returns,
            &covariance,
            &current,
            constraints,
            &sector_bounds,
            &mut warnings,
        );

        let sum: f64 = x.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(OptimizationError::Numerical(format!(
                "weights sum to {} after projection",
                sum
            )));
        }

        let expected_return = expected_returns.dot(&x);
        let variance = (&covariance * &x).dot(&x).max(0.0);
        let expected_volatility = variance.sqrt();
        let sharpe_ratio = if expected_volatility > 0.0 {
            (expected_return - self.risk_free_rate) / expected_volatility
        } else {
            warnings.push(OptimizationWarning::ZeroDenominator {
                metric: "sharpe_ratio".to_string(),
            });
            0.0
        };

        let turnover: f64 = (&x - &current).abs().sum();
        let transaction_costs: f64 = ordered
            .iter()
            .enumerate()
            .map(|(i, a)| (x[i] - a.current_weight).abs() * a.transaction_cost)
            .sum();

        let objective_value = match objective {
            OptimizationObjective::MaximizeSharpe => sharpe_ratio,
            OptimizationObjective::MinimizeVariance => variance,
            OptimizationObjective::MaximizeReturn => expected_return,
            OptimizationObjective::RiskParity => base_objective(
                &x,
                &expected_returns,
                &covariance,
                OptimizationObjective::RiskParity,
                self.risk_free_rate,
            ),
        };

        let weights = ordered
            .iter()
            .enumerate()
            .map(|(i, a)| (a.asset_id.clone(), x[i]))
            .collect();

        Ok(PortfolioAllocation {
            weights,
            objective,
            expected_return,
            expected_volatility,
            sharpe_ratio,
            objective_value,
            status,
            iterations: total_iterations,
            turnover,
            transaction_costs,
            warnings,
        })
    }

    /// Trace the efficient frontier with a minimum-variance sweep over
    /// target returns. Infeasible target points are skipped.
    pub fn efficient_frontier(
        &self,
        assets: &[AssetParameters],
        correlation: &CorrelationMatrix,
        n_points: usize,
    ) -> Result<Vec<FrontierPoint>, OptimizationError> {
        if n_points < 2 {
            return Err(OptimizationError::InvalidInput(
                "frontier needs at least 2 points".to_string(),
            ));
        }
        let returns: Vec<f64> = assets.iter().map(|a| a.expected_return).collect();
        let min_return = returns.iter().copied().fold(f64::INFINITY, f64::min);
        let max_return = returns.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let mut points = Vec::with_capacity(n_points);
        for k in 0..n_points {
            let target =
                min_return + (max_return - min_return) * k as f64 / (n_points - 1) as f64;
            let constraints = OptimizationConstraints {
                target_return: Some(target),
                ..Default::default()
            };
            match self.optimise(
                assets,
                correlation,
                OptimizationObjective::MinimizeVariance,
                &constraints,
            ) {
                Ok(allocation) => points.push(FrontierPoint {
                    expected_volatility: allocation.expected_volatility,
                    expected_return: allocation.expected_return,
                }),
                Err(_) => continue,
            }
        }
        Ok(points)
    }

    /// Projected-gradient descent with backtracking line search.
    fn descend<F>(
        &self,
        mut x: DVector<f64>,
        lower: &[f64],
        upper: &[f64],
        objective: &F,
    ) -> Result<(DVector<f64>, SolverStatus, usize), OptimizationError>
    where
        F: Fn(&DVector<f64>) -> f64,
    {
        let mut fx = objective(&x);
        if !fx.is_finite() {
            return Err(OptimizationError::Numerical(
                "objective is non-finite at the starting point".to_string(),
            ));
        }

        for iteration in 0..self.max_iterations {
            let gradient = numerical_gradient(objective, &x)?;

            let mut step = 1.0;
            let mut moved = false;
            while step > 1e-14 {
                let candidate = project_to_simplex(&(&x - &gradient * step), lower, upper);
                let fc = objective(&candidate);
                if !fc.is_finite() {
                    return Err(OptimizationError::Numerical(
                        "objective became non-finite during line search".to_string(),
                    ));
                }
                if fc < fx - 1e-15 {
                    let displacement = (&candidate - &x).abs().max();
                    x = candidate;
                    fx = fc;
                    moved = true;
                    if displacement < self.tolerance {
                        return Ok((x, SolverStatus::Converged, iteration + 1));
                    }
                    break;
                }
                step *= 0.5;
            }

            if !moved {
                // No descent direction improves the objective: local optimum
                return Ok((x, SolverStatus::Converged, iteration + 1));
            }
        }

        Ok((x, SolverStatus::MaxIterationsExceeded, self.max_iterations))
    }
}

/// Reorder assets to match the correlation matrix identifier order.
fn order_assets<'a>(
    assets: &'a [AssetParameters],
    correlation: &CorrelationMatrix,
) -> Result<Vec<&'a AssetParameters>, OptimizationError> {
    if assets.is_empty() {
        return Err(OptimizationError::InvalidInput(
            "at least one asset is required".to_string(),
        ));
    }
    if assets.len() != correlation.dimension() {
        return Err(OptimizationError::InvalidInput(format!(
            "{} assets supplied for a {}-asset correlation matrix",
            assets.len(),
            correlation.dimension()
        )));
    }
    correlation
        .asset_ids
        .iter()
        .map(|id| {
            assets
                .iter()
                .find(|a| &a.asset_id == id)
                .ok_or_else(|| {
                    OptimizationError::InvalidInput(format!(
                        "asset {} from the correlation matrix is missing",
                        id
                    ))
                })
        })
        .collect()
}

/// Resolve per-asset bounds and check joint feasibility.
fn resolve_bounds(
    assets: &[&AssetParameters],
    constraints: &OptimizationConstraints,
) -> Result<(Vec<f64>, Vec<f64>), OptimizationError> {
    let mut lower = Vec::with_capacity(assets.len());
    let mut upper = Vec::with_capacity(assets.len());
    for asset in assets {
        let l = constraints
            .min_weights
            .get(&asset.asset_id)
            .copied()
            .unwrap_or(asset.min_weight);
        let u = constraints
            .max_weights
            .get(&asset.asset_id)
            .copied()
            .unwrap_or(asset.max_weight);
        if l > u {
            return Err(OptimizationError::Infeasible(format!(
                "asset {} has lower bound {} above upper bound {}",
                asset.asset_id, l, u
            )));
        }
        lower.push(l);
        upper.push(u);
    }
    let sum_lower: f64 = lower.iter().sum();
    let sum_upper: f64 = upper.iter().sum();
    if sum_lower > 1.0 + 1e-12 {
        return Err(OptimizationError::Infeasible(format!(
            "minimum weights sum to {}",
            sum_lower
        )));
    }
    if sum_upper < 1.0 - 1e-12 {
        return Err(OptimizationError::Infeasible(format!(
            "maximum weights sum to {}",
            sum_upper
        )));
    }
    Ok((lower, upper))
}

/// Resolve sector limits to asset index sets.
fn resolve_sector_bounds(
    assets: &[&AssetParameters],
    constraints: &OptimizationConstraints,
) -> Result<Vec<SectorBound>, OptimizationError> {
    let mut bounds = Vec::new();
    for (sector, &(min, max)) in &constraints.sector_limits {
        if min > max {
            return Err(OptimizationError::Infeasible(format!(
                "sector {} has lower bound {} above upper bound {}",
                sector, min, max
            )));
        }
        let indices: Vec<usize> = assets
            .iter()
            .enumerate()
            .filter(|(_, a)| a.sector.as_deref() == Some(sector.as_str()))
            .map(|(i, _)| i)
            .collect();
        if indices.is_empty() {
            if min > 0.0 {
                return Err(OptimizationError::Infeasible(format!(
                    "sector {} requires minimum weight {} but no asset carries that sector",
                    sector, min
                )));
            }
            continue;
        }
        bounds.push(SectorBound {
            name: sector.clone(),
            indices,
            min,
            max,
        });
    }
    Ok(bounds)
}

/// Objective value (minimisation form) for the chosen objective.
fn base_objective(
    w: &DVector<f64>,
    expected_returns: &DVector<f64>,
    covariance: &DMatrix<f64>,
    objective: OptimizationObjective,
    risk_free_rate: f64,
) -> f64 {
    let portfolio_return = expected_returns.dot(w);
    let variance = (covariance * w).dot(w).max(0.0);
    match objective {
        OptimizationObjective::MinimizeVariance => variance,
        OptimizationObjective::MaximizeReturn => -portfolio_return,
        OptimizationObjective::MaximizeSharpe => {
            let vol = variance.sqrt();
            if vol > 0.0 {
                -(portfolio_return - risk_free_rate) / vol
            } else {
                0.0
            }
        }
        OptimizationObjective::RiskParity => {
            if variance <= 0.0 {
                return 0.0;
            }
            let marginal = covariance * w;
            let n = w.len() as f64;
            let target = 1.0 / n;
            (0..w.len())
                .map(|i| {
                    let rc = w[i] * marginal[i] / variance;
                    (rc - target) * (rc - target)
                })
                .sum()
        }
    }
}

/// Quadratic penalty for the non-projected constraints.
fn penalty(
    w: &DVector<f64>,
    expected_returns: &DVector<f64>,
    covariance: &DMatrix<f64>,
    current: &DVector<f64>,
    constraints: &OptimizationConstraints,
    sector_bounds: &[SectorBound],
) -> f64 {
    let mut total = 0.0;
    if let Some(target) = constraints.target_return {
        let gap = expected_returns.dot(w) - target;
        total += gap * gap;
    }
    if let Some(max_variance) = constraints.max_variance {
        let excess = ((covariance * w).dot(w) - max_variance).max(0.0);
        total += excess * excess;
    }
    if let Some(limit) = constraints.turnover_limit {
        let excess = ((w - current).abs().sum() - limit).max(0.0);
        total += excess * excess;
    }
    for bound in sector_bounds {
        let sector_weight: f64 = bound.indices.iter().map(|&i| w[i]).sum();
        let below = (bound.min - sector_weight).max(0.0);
        let above = (sector_weight - bound.max).max(0.0);
        total += below * below + above * above;
    }
    total
}

/// Whether any penalised constraint is violated beyond tolerance.
fn constraints_violated(
    w: &DVector<f64>,
    expected_returns: &DVector<f64>,
    covariance: &DMatrix<f64>,
    current: &DVector<f64>,
    constraints: &OptimizationConstraints,
    sector_bounds: &[SectorBound],
) -> bool {
    let mut warnings = Vec::new();
    collect_constraint_warnings(
        w,
        expected_returns,
        covariance,
        current,
        constraints,
        sector_bounds,
        &mut warnings,
    );
    !warnings.is_empty()
}

/// Record a warning for each penalised constraint still violated at `w`.
#[allow(clippy::too_many_arguments)]
fn collect_constraint_warnings(
    w: &DVector<f64>,
    expected_returns: &DVector<f64>,
    covariance: &DMatrix<f64>,
    current: &DVector<f64>,
    constraints: &OptimizationConstraints,
    sector_bounds: &[SectorBound],
    warnings: &mut Vec<OptimizationWarning>,
) {
    for bound in sector_bounds {
        let sector_weight: f64 = bound.indices.iter().map(|&i| w[i]).sum();
        let residual = (bound.min - sector_weight).max(sector_weight - bound.max);
        if residual > 1e-6 {
            warnings.push(OptimizationWarning::ConstraintViolated {
                constraint: format!("sector:{}", bound.name),
                residual,
            });
        }
    }
    if let Some(target) = constraints.target_return {
        let residual = (expected_returns.dot(w) - target).abs();
        if residual > TARGET_RETURN_TOLERANCE {
            warnings.push(OptimizationWarning::ConstraintViolated {
                constraint: "target_return".to_string(),
                residual,
            });
        }
    }
    if let Some(max_variance) = constraints.max_variance {
        let residual = (covariance * w).dot(w) - max_variance;
        if residual > 1e-8 {
            warnings.push(OptimizationWarning::ConstraintViolated {
                constraint: "max_variance".to_string(),
                residual,
            });
        }
    }
    if let Some(limit) = constraints.turnover_limit {
        let residual = (w - current).abs().sum() - limit;
        if residual > 1e-6 {
            warnings.push(OptimizationWarning::ConstraintViolated {
                constraint: "turnover_limit".to_string(),
                residual,
            });
        }
    }
}

/// Central-difference gradient.
fn numerical_gradient<F>(
    objective: &F,
    x: &DVector<f64>,
) -> Result<DVector<f64>, OptimizationError>
where
    F: Fn(&DVector<f64>) -> f64,
{
    const H: f64 = 1e-7;
    let mut gradient = DVector::zeros(x.len());
    let mut probe = x.clone();
    for i in 0..x.len() {
        probe[i] = x[i] + H;
        let up = objective(&probe);
        probe[i] = x[i] - H;
        let down = objective(&probe);
        probe[i] = x[i];
        let g = (up - down) / (2.0 * H);
        if !g.is_finite() {
            return Err(OptimizationError::Numerical(format!(
                "gradient component {} is non-finite",
                i
            )));
        }
        gradient[i] = g;
    }
    Ok(gradient)
}

/// Euclidean projection onto `{sum w = 1, lower <= w <= upper}`.
///
/// Bisection on the shift `tau` in `w_i = clamp(v_i - tau, l_i, u_i)`;
/// the clamped sum is non-increasing in `tau`, so the bracket
/// `[min(v - u), max(v - l)]` always contains the solution when the bound
/// set is feasible.
fn project_to_simplex(v: &DVector<f64>, lower: &[f64], upper: &[f64]) -> DVector<f64> {
    let n = v.len();
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for i in 0..n {
        lo = lo.min(v[i] - upper[i]);
        hi = hi.max(v[i] - lower[i]);
    }

    let clamped_sum = |tau: f64| -> f64 {
        (0..n)
            .map(|i| (v[i] - tau).clamp(lower[i], upper[i]))
            .sum()
    };

    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if clamped_sum(mid) > 1.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    let tau = 0.5 * (lo + hi);
    DVector::from_iterator(n, (0..n).map(|i| (v[i] - tau).clamp(lower[i], upper[i])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::{CorrelationMatrix, CorrelationMethod};
    use approx::assert_relative_eq;

    fn identity_correlation(ids: &[&str]) -> CorrelationMatrix {
        CorrelationMatrix::from_estimate(
            DMatrix::identity(ids.len(), ids.len()),
            ids.iter().map(|s| s.to_string()).collect(),
            CorrelationMethod::Historical,
            100,
        )
        .unwrap()
    }

    fn correlated_pair(rho: f64) -> CorrelationMatrix {
        CorrelationMatrix::from_estimate(
            DMatrix::from_row_slice(2, 2, &[1.0, rho, rho, 1.0]),
            vec!["a".to_string(), "b".to_string()],
            CorrelationMethod::Historical,
            100,
        )
        .unwrap()
    }

    #[test]
    fn test_minimum_variance_two_identical_assets_splits_evenly() {
        // Equal volatility, zero correlation, equal expected return
        let assets = vec![
            AssetParameters::new("a", 0.08, 0.2),
            AssetParameters::new("b", 0.08, 0.2),
        ];
        let optimiser = PortfolioOptimiser::default();
        let allocation = optimiser
            .optimise(
                &assets,
                &correlated_pair(0.0),
                OptimizationObjective::MinimizeVariance,
                &OptimizationConstraints::default(),
            )
            .unwrap();

        assert_eq!(allocation.status, SolverStatus::Converged);
        assert_relative_eq!(allocation.weights["a"], 0.5, epsilon = 1e-3);
        assert_relative_eq!(allocation.weights["b"], 0.5, epsilon = 1e-3);
        assert!(allocation.warnings.is_empty());
    }

    #[test]
    fn test_weights_sum_to_one() {
        let assets = vec![
            AssetParameters::new("a", 0.10, 0.25),
            AssetParameters::new("b", 0.05, 0.12),
            AssetParameters::new("c", 0.07, 0.18),
        ];
        let optimiser = PortfolioOptimiser::default();
        for objective in [
            OptimizationObjective::MaximizeSharpe,
            OptimizationObjective::MinimizeVariance,
            OptimizationObjective::MaximizeReturn,
            OptimizationObjective::RiskParity,
        ] {
            let allocation = optimiser
                .optimise(
                    &assets,
                    &identity_correlation(&["a", "b", "c"]),
                    objective,
                    &OptimizationConstraints::default(),
                )
                .unwrap();
            let sum: f64 = allocation.weights.values().sum();
            assert!(
                (sum - 1.0).abs() < 1e-6,
                "{:?} weights sum to {}",
                objective,
                sum
            );
        }
    }

    #[test]
    fn test_maximize_return_goes_to_best_asset() {
        let assets = vec![
            AssetParameters::new("best", 0.15, 0.3),
            AssetParameters::new("worst", 0.03, 0.1),
        ];
        let optimiser = PortfolioOptimiser::default();
        let allocation = optimiser
            .optimise(
                &assets,
                &identity_correlation(&["best", "worst"]),
                OptimizationObjective::MaximizeReturn,
                &OptimizationConstraints::default(),
            )
            .unwrap();
        assert_relative_eq!(allocation.weights["best"], 1.0, epsilon = 1e-3);
        assert_relative_eq!(allocation.expected_return, 0.15, epsilon = 1e-3);
    }

    #[test]
    fn test_bounds_are_respected() {
        let assets = vec![
            AssetParameters::new("best", 0.15, 0.3).with_bounds(0.0, 0.6),
            AssetParameters::new("worst", 0.03, 0.1),
        ];
        let optimiser = PortfolioOptimiser::default();
        let allocation = optimiser
            .optimise(
                &assets,
                &identity_correlation(&["best", "worst"]),
                OptimizationObjective::MaximizeReturn,
                &OptimizationConstraints::default(),
            )
            .unwrap();
        assert!(allocation.weights["best"] <= 0.6 + 1e-9);
        assert_relative_eq!(allocation.weights["best"], 0.6, epsilon = 1e-3);
        assert_relative_eq!(allocation.weights["worst"], 0.4, epsilon = 1e-3);
    }

    #[test]
    fn test_constraint_override_beats_asset_default() {
        let assets = vec![
            AssetParameters::new("a", 0.10, 0.2),
            AssetParameters::new("b", 0.05, 0.2),
        ];
        let mut constraints = OptimizationConstraints::default();
        constraints.max_weights.insert("a".to_string(), 0.3);
        let optimiser = PortfolioOptimiser::default();
        let allocation = optimiser
            .optimise(
                &assets,
                &identity_correlation(&["a", "b"]),
                OptimizationObjective::MaximizeReturn,
                &constraints,
            )
            .unwrap();
        assert!(allocation.weights["a"] <= 0.3 + 1e-9);
    }

    #[test]
    fn test_infeasible_bounds_is_error() {
        let assets = vec![
            AssetParameters::new("a", 0.10, 0.2).with_bounds(0.8, 1.0),
            AssetParameters::new("b", 0.05, 0.2).with_bounds(0.8, 1.0),
        ];
        let optimiser = PortfolioOptimiser::default();
        let result = optimiser.optimise(
            &assets,
            &identity_correlation(&["a", "b"]),
            OptimizationObjective::MinimizeVariance,
            &OptimizationConstraints::default(),
        );
        assert!(matches!(result, Err(OptimizationError::Infeasible(_))));
    }

    #[test]
    fn test_upper_bounds_below_one_is_infeasible() {
        let assets = vec![
            AssetParameters::new("a", 0.10, 0.2).with_bounds(0.0, 0.4),
            AssetParameters::new("b", 0.05, 0.2).with_bounds(0.0, 0.4),
        ];
        let optimiser = PortfolioOptimiser::default();
        let result = optimiser.optimise(
            &assets,
            &identity_correlation(&["a", "b"]),
            OptimizationObjective::MinimizeVariance,
            &OptimizationConstraints::default(),
        );
        assert!(matches!(result, Err(OptimizationError::Infeasible(_))));
    }

    #[test]
    fn test_minimum_variance_weights_inverse_to_variance() {
        // Zero correlation: min-variance weights are proportional to 1/var
        let assets = vec![
            AssetParameters::new("low", 0.05, 0.1),
            AssetParameters::new("high", 0.05, 0.2),
        ];
        let optimiser = PortfolioOptimiser::default();
        let allocation = optimiser
            .optimise(
                &assets,
                &identity_correlation(&["high", "low"]),
                OptimizationObjective::MinimizeVariance,
                &OptimizationConstraints::default(),
            )
            .unwrap();
        // 1/0.01 : 1/0.04 = 0.8 : 0.2
        assert_relative_eq!(allocation.weights["low"], 0.8, epsilon = 1e-2);
        assert_relative_eq!(allocation.weights["high"], 0.2, epsilon = 1e-2);
    }

    #[test]
    fn test_risk_parity_inverse_volatility_weights() {
        // Zero correlation: risk parity weights proportional to 1/vol
        let assets = vec![
            AssetParameters::new("low", 0.05, 0.1),
            AssetParameters::new("high", 0.05, 0.2),
        ];
        let optimiser = PortfolioOptimiser::default();
        let allocation = optimiser
            .optimise(
                &assets,
                &identity_correlation(&["high", "low"]),
                OptimizationObjective::RiskParity,
                &OptimizationConstraints::default(),
            )
            .unwrap();
        assert_relative_eq!(allocation.weights["low"], 2.0 / 3.0, epsilon = 0.02);
        assert_relative_eq!(allocation.weights["high"], 1.0 / 3.0, epsilon = 0.02);
    }

    #[test]
    fn test_maximize_sharpe_prefers_better_ratio() {
        let assets = vec![
            AssetParameters::new("good", 0.12, 0.15),
            AssetParameters::new("poor", 0.04, 0.25),
        ];
        let optimiser = PortfolioOptimiser::new(0.02);
        let allocation = optimiser
            .optimise(
                &assets,
                &identity_correlation(&["good", "poor"]),
                OptimizationObjective::MaximizeSharpe,
                &OptimizationConstraints::default(),
            )
            .unwrap();
        assert!(
            allocation.weights["good"] > 0.85,
            "good-asset weight {} too low",
            allocation.weights["good"]
        );
        assert!(allocation.sharpe_ratio > 0.0);
    }

    #[test]
    fn test_target_return_constraint_is_met() {
        let assets = vec![
            AssetParameters::new("a", 0.12, 0.2),
            AssetParameters::new("b", 0.04, 0.1),
        ];
        let constraints = OptimizationConstraints {
            target_return: Some(0.08),
            ..Default::default()
        };
        let optimiser = PortfolioOptimiser::default();
        let allocation = optimiser
            .optimise(
                &assets,
                &identity_correlation(&["a", "b"]),
                OptimizationObjective::MinimizeVariance,
                &constraints,
            )
            .unwrap();
        assert_relative_eq!(allocation.expected_return, 0.08, epsilon = 1e-3);
        assert!(allocation
            .warnings
            .iter()
            .all(|w| !matches!(w, OptimizationWarning::ConstraintViolated { .. })));
    }

    #[test]
    fn test_turnover_limit_keeps_allocation_close() {
        let assets = vec![
            AssetParameters::new("a", 0.12, 0.2).with_current_weight(0.5),
            AssetParameters::new("b", 0.04, 0.1).with_current_weight(0.5),
        ];
        let constraints = OptimizationConstraints {
            turnover_limit: Some(0.2),
            ..Default::default()
        };
        let optimiser = PortfolioOptimiser::default();
        let allocation = optimiser
            .optimise(
                &assets,
                &identity_correlation(&["a", "b"]),
                OptimizationObjective::MaximizeReturn,
                &constraints,
            )
            .unwrap();
        assert!(
            allocation.turnover <= 0.2 + 0.01,
            "turnover {} exceeds the limit",
            allocation.turnover
        );
    }

    #[test]
    fn test_sector_limit_caps_sector_weight() {
        let assets = vec![
            AssetParameters::new("a", 0.15, 0.2).with_sector("tech"),
            AssetParameters::new("b", 0.12, 0.2).with_sector("tech"),
            AssetParameters::new("c", 0.04, 0.1).with_sector("utilities"),
        ];
        let mut constraints = OptimizationConstraints::default();
        constraints
            .sector_limits
            .insert("tech".to_string(), (0.0, 0.5));

        let optimiser = PortfolioOptimiser::default();
        let allocation = optimiser
            .optimise(
                &assets,
                &identity_correlation(&["a", "b", "c"]),
                OptimizationObjective::MaximizeReturn,
                &constraints,
            )
            .unwrap();

        let tech_weight = allocation.weights["a"] + allocation.weights["b"];
        assert!(
            tech_weight <= 0.5 + 0.01,
            "tech weight {} exceeds the sector cap",
            tech_weight
        );
        assert!(allocation.weights["c"] >= 0.49);
    }

    #[test]
    fn test_sector_minimum_without_members_is_infeasible() {
        let assets = vec![
            AssetParameters::new("a", 0.1, 0.2),
            AssetParameters::new("b", 0.05, 0.1),
        ];
        let mut constraints = OptimizationConstraints::default();
        constraints
            .sector_limits
            .insert("energy".to_string(), (0.2, 0.8));

        let optimiser = PortfolioOptimiser::default();
        let result = optimiser.optimise(
            &assets,
            &identity_correlation(&["a", "b"]),
            OptimizationObjective::MinimizeVariance,
            &constraints,
        );
        assert!(matches!(result, Err(OptimizationError::Infeasible(_))));
    }

    #[test]
    fn test_asset_matrix_mismatch_is_error() {
        let assets = vec![AssetParameters::new("x", 0.1, 0.2)];
        let optimiser = PortfolioOptimiser::default();
        let result = optimiser.optimise(
            &assets,
            &identity_correlation(&["a"]),
            OptimizationObjective::MinimizeVariance,
            &OptimizationConstraints::default(),
        );
        assert!(matches!(result, Err(OptimizationError::InvalidInput(_))));
    }

    #[test]
    fn test_efficient_frontier_is_ordered_by_return() {
        let assets = vec![
            AssetParameters::new("a", 0.04, 0.1),
            AssetParameters::new("b", 0.12, 0.3),
        ];
        let optimiser = PortfolioOptimiser::default();
        let frontier = optimiser
            .efficient_frontier(&assets, &correlated_pair(0.2), 8)
            .unwrap();
        assert!(frontier.len() >= 6);
        for pair in frontier.windows(2) {
            assert!(pair[1].expected_return >= pair[0].expected_return - 1e-6);
        }
    }

    #[test]
    fn test_projection_respects_bounds_and_sum() {
        let v = DVector::from_vec(vec![0.9, 0.8, -0.5]);
        let lower = [0.0, 0.0, 0.05];
        let upper = [0.5, 0.5, 1.0];
        let projected = project_to_simplex(&v, &lower, &upper);

        let sum: f64 = projected.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        for i in 0..3 {
            assert!(projected[i] >= lower[i] - 1e-12);
            assert!(projected[i] <= upper[i] + 1e-12);
        }
    }
}
