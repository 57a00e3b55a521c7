//! Stress scenario definitions and shock application.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use risk_simulation::SimulationParameters;

use crate::error::StressError;

/// Severity tier of a stress scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioSeverity {
    /// Routine adverse move.
    Mild,
    /// Meaningful drawdown territory.
    Moderate,
    /// Crisis conditions.
    Severe,
    /// Historical worst-case territory.
    Extreme,
}

impl ScenarioSeverity {
    /// Tier index, 0 (mild) through 3 (extreme).
    pub fn index(&self) -> usize {
        match self {
            ScenarioSeverity::Mild => 0,
            ScenarioSeverity::Moderate => 1,
            ScenarioSeverity::Severe => 2,
            ScenarioSeverity::Extreme => 3,
        }
    }
}

/// Named shock parameters of a scenario. All fields optional; unset
/// shocks leave the corresponding base parameter untouched.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ShockParameters {
    /// Total return shock over the scenario horizon, e.g. `-0.40`.
    pub equity_return_shock: Option<f64>,
    /// Interest rate move in basis points; higher rates depress drift.
    pub interest_rate_shift_bp: Option<f64>,
    /// Credit spread widening in basis points; widening depresses drift.
    pub credit_spread_shift_bp: Option<f64>,
    /// FX depreciation as a fraction.
    pub fx_shock: Option<f64>,
    /// Multiplicative volatility shock, e.g. `2.5`.
    pub volatility_multiplier: Option<f64>,
    /// Additive volatility shock.
    pub volatility_shift: Option<f64>,
    /// Uniform increase applied to off-diagonal correlations.
    pub correlation_shift: Option<f64>,
}

impl ShockParameters {
    /// No shocks.
    pub fn none() -> Self {
        Self::default()
    }

    /// Set the equity return shock.
    pub fn with_equity_shock(mut self, shock: f64) -> Self {
        self.equity_return_shock = Some(shock);
        self
    }

    /// Set the interest rate shift in basis points.
    pub fn with_rate_shift_bp(mut self, bp: f64) -> Self {
        self.interest_rate_shift_bp = Some(bp);
        self
    }

    /// Set the credit spread shift in basis points.
    pub fn with_credit_spread_bp(mut self, bp: f64) -> Self {
        self.credit_spread_shift_bp = Some(bp);
        self
    }

    /// Set the FX shock.
    pub fn with_fx_shock(mut self, shock: f64) -> Self {
        self.fx_shock = Some(shock);
        self
    }

    /// Set the volatility multiplier.
    pub fn with_volatility_multiplier(mut self, multiplier: f64) -> Self {
        self.volatility_multiplier = Some(multiplier);
        self
    }

    /// Set the additive volatility shift.
    pub fn with_volatility_shift(mut self, shift: f64) -> Self {
        self.volatility_shift = Some(shift);
        self
    }

    /// Set the correlation shift.
    pub fn with_correlation_shift(mut self, shift: f64) -> Self {
        self.correlation_shift = Some(shift);
        self
    }
}

/// A named stress scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressScenario {
    /// Stable identifier, e.g. `"gfc_2008"`.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// What the scenario represents.
    pub description: String,
    /// Severity tier.
    pub severity: ScenarioSeverity,
    /// Scenario horizon in years; shocked simulations run over this
    /// horizon.
    pub time_horizon: f64,
    /// The shocks to apply.
    pub shocks: ShockParameters,
    /// Estimated annual probability of a scenario at least this severe.
    pub annual_probability: Option<f64>,
}

impl StressScenario {
    /// Create a scenario; the description defaults to the name.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        severity: ScenarioSeverity,
        time_horizon: f64,
        shocks: ShockParameters,
    ) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            description: name.clone(),
            name,
            severity,
            time_horizon,
            shocks,
            annual_probability: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the estimated annual probability.
    pub fn with_probability(mut self, probability: f64) -> Self {
        self.annual_probability = Some(probability);
        self
    }

    /// Apply this scenario's shocks to a base parameter set.
    ///
    /// The return shock is converted to a drift adjustment spread over the
    /// scenario horizon; rate and spread moves depress the drift by their
    /// decimal value; the volatility multiplier applies before the
    /// additive shift. The shocked simulation runs over the scenario's
    /// horizon with the base seed, step count, and path count unchanged.
    ///
    /// # Errors
    ///
    /// [`StressError::InvalidScenario`] when the shocked parameters are
    /// invalid (e.g. the additive shift drives volatility negative).
    pub fn apply(&self, base: &SimulationParameters) -> Result<SimulationParameters, StressError> {
        if self.time_horizon <= 0.0 || !self.time_horizon.is_finite() {
            return Err(StressError::InvalidScenario(format!(
                "scenario {} has invalid time horizon {}",
                self.id, self.time_horizon
            )));
        }

        let mut drift = base.drift;
        if let Some(shock) = self.shocks.equity_return_shock {
            drift += shock / self.time_horizon;
        }
        if let Some(bp) = self.shocks.interest_rate_shift_bp {
            drift -= bp / 10_000.0;
        }
        if let Some(bp) = self.shocks.credit_spread_shift_bp {
            drift -= bp / 10_000.0;
        }

        let mut volatility = base.volatility;
        if let Some(multiplier) = self.shocks.volatility_multiplier {
            if multiplier < 0.0 {
                return Err(StressError::InvalidScenario(format!(
                    "scenario {} has negative volatility multiplier {}",
                    self.id, multiplier
                )));
            }
            volatility *= multiplier;
        }
        if let Some(shift) = self.shocks.volatility_shift {
            volatility += shift;
        }

        let mut shocked = SimulationParameters::new(
            base.initial_price,
            drift,
            volatility,
            self.time_horizon,
            base.time_steps,
            base.num_paths,
        )
        .map_err(|e| StressError::InvalidScenario(format!("scenario {}: {}", self.id, e)))?;
        shocked.time_unit = base.time_unit;
        shocked.seed = base.seed;
        Ok(shocked)
    }
}

/// Threshold limits checked against stressed metrics.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RiskLimits {
    /// Limit on 95% VaR in currency terms.
    pub var_95: Option<f64>,
    /// Limit on 99% VaR in currency terms.
    pub var_99: Option<f64>,
    /// Limit on 95% expected shortfall in currency terms.
    pub expected_shortfall: Option<f64>,
    /// Limit on portfolio return volatility.
    pub volatility: Option<f64>,
    /// Limit on maximum drawdown.
    pub max_drawdown: Option<f64>,
}

/// The portfolio a stress test is run against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressPortfolio {
    /// Total portfolio value in currency terms (> 0).
    pub total_value: f64,
    /// Asset weights; keys must match the base parameter set.
    pub weights: BTreeMap<String, f64>,
    /// Regulatory capital backing the portfolio.
    pub regulatory_capital: f64,
    /// Risk limits checked under stress.
    pub limits: RiskLimits,
}

impl StressPortfolio {
    /// Create a portfolio with no capital figure and no limits.
    ///
    /// # Errors
    ///
    /// [`StressError::InvalidPortfolio`] for a non-positive total value or
    /// an empty weight map.
    pub fn new(
        total_value: f64,
        weights: BTreeMap<String, f64>,
    ) -> Result<Self, StressError> {
        if !total_value.is_finite() || total_value <= 0.0 {
            return Err(StressError::InvalidPortfolio(format!(
                "total value must be positive, got {}",
                total_value
            )));
        }
        if weights.is_empty() {
            return Err(StressError::InvalidPortfolio(
                "portfolio weights are required".to_string(),
            ));
        }
        Ok(Self {
            total_value,
            weights,
            regulatory_capital: 0.0,
            limits: RiskLimits::default(),
        })
    }

    /// Set the regulatory capital figure.
    pub fn with_regulatory_capital(mut self, capital: f64) -> Self {
        self.regulatory_capital = capital;
        self
    }

    /// Set the risk limits.
    pub fn with_limits(mut self, limits: RiskLimits) -> Self {
        self.limits = limits;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn base_params() -> SimulationParameters {
        SimulationParameters::new(100.0, 0.05, 0.2, 1.0, 12, 100)
            .unwrap()
            .with_seed(5)
    }

    #[test]
    fn test_severity_ordering() {
        assert!(ScenarioSeverity::Mild < ScenarioSeverity::Extreme);
        assert_eq!(ScenarioSeverity::Severe.index(), 2);
    }

    #[test]
    fn test_equity_shock_adjusts_drift_over_horizon() {
        let scenario = StressScenario::new(
            "crash",
            "Equity crash",
            ScenarioSeverity::Severe,
            2.0,
            ShockParameters::none().with_equity_shock(-0.40),
        );
        let shocked = scenario.apply(&base_params()).unwrap();
        // -40% spread over 2 years: drift drops by 0.20
        assert_relative_eq!(shocked.drift, 0.05 - 0.20, epsilon = 1e-12);
        assert_relative_eq!(shocked.time_horizon, 2.0, epsilon = 1e-12);
        assert_eq!(shocked.seed, Some(5));
    }

    #[test]
    fn test_rate_shift_depresses_drift() {
        let scenario = StressScenario::new(
            "rates",
            "Rate shock",
            ScenarioSeverity::Moderate,
            1.0,
            ShockParameters::none().with_rate_shift_bp(200.0),
        );
        let shocked = scenario.apply(&base_params()).unwrap();
        assert_relative_eq!(shocked.drift, 0.05 - 0.02, epsilon = 1e-12);
    }

    #[test]
    fn test_volatility_multiplier_then_shift() {
        let scenario = StressScenario::new(
            "vol",
            "Vol spike",
            ScenarioSeverity::Severe,
            1.0,
            ShockParameters::none()
                .with_volatility_multiplier(2.0)
                .with_volatility_shift(0.05),
        );
        let shocked = scenario.apply(&base_params()).unwrap();
        assert_relative_eq!(shocked.volatility, 0.2 * 2.0 + 0.05, epsilon = 1e-12);
    }

    #[test]
    fn test_negative_volatility_after_shift_is_error() {
        let scenario = StressScenario::new(
            "bad",
            "Bad shift",
            ScenarioSeverity::Mild,
            1.0,
            ShockParameters::none().with_volatility_shift(-0.5),
        );
        assert!(matches!(
            scenario.apply(&base_params()),
            Err(StressError::InvalidScenario(_))
        ));
    }

    #[test]
    fn test_negative_multiplier_is_error() {
        let scenario = StressScenario::new(
            "bad",
            "Bad multiplier",
            ScenarioSeverity::Mild,
            1.0,
            ShockParameters::none().with_volatility_multiplier(-1.0),
        );
        assert!(matches!(
            scenario.apply(&base_params()),
            Err(StressError::InvalidScenario(_))
        ));
    }

    #[test]
    fn test_no_shocks_preserves_drift_and_vol() {
        let scenario = StressScenario::new(
            "noop",
            "No shocks",
            ScenarioSeverity::Mild,
            1.0,
            ShockParameters::none(),
        );
        let shocked = scenario.apply(&base_params()).unwrap();
        assert_eq!(shocked.drift, 0.05);
        assert_eq!(shocked.volatility, 0.2);
    }

    #[test]
    fn test_portfolio_validation() {
        assert!(StressPortfolio::new(0.0, BTreeMap::new()).is_err());
        let mut weights = BTreeMap::new();
        weights.insert("a".to_string(), 1.0);
        assert!(StressPortfolio::new(-5.0, weights.clone()).is_err());
        assert!(StressPortfolio::new(1_000_000.0, weights).is_ok());
    }

    #[test]
    fn test_scenario_serde_roundtrip() {
        let scenario = StressScenario::new(
            "gfc",
            "Crisis",
            ScenarioSeverity::Extreme,
            2.0,
            ShockParameters::none()
                .with_equity_shock(-0.4)
                .with_volatility_multiplier(2.5),
        )
        .with_probability(0.01);
        let json = serde_json::to_string(&scenario).unwrap();
        let back: StressScenario = serde_json::from_str(&json).unwrap();
        assert_eq!(back, scenario);
    }
}
