//! Preset stress scenarios.
//!
//! Historical crisis calibrations plus severity-tiered hypothetical
//! generators for the common single-factor shocks.

use crate::scenario::{ScenarioSeverity, ShockParameters, StressScenario};

/// 2008 global financial crisis calibration.
pub fn financial_crisis_2008() -> StressScenario {
    StressScenario::new(
        "gfc_2008",
        "2008 Global Financial Crisis",
        ScenarioSeverity::Extreme,
        2.0,
        ShockParameters::none()
            .with_equity_shock(-0.40)
            .with_credit_spread_bp(400.0)
            .with_volatility_multiplier(2.5)
            .with_correlation_shift(0.3),
    )
    .with_description("Severe financial market stress similar to the 2008 crisis")
    .with_probability(0.01)
}

/// COVID-19 market crash calibration.
pub fn covid_crash_2020() -> StressScenario {
    StressScenario::new(
        "covid_2020",
        "COVID-19 Market Crash",
        ScenarioSeverity::Severe,
        1.0,
        ShockParameters::none()
            .with_equity_shock(-0.35)
            .with_credit_spread_bp(300.0)
            .with_volatility_multiplier(3.0)
            .with_correlation_shift(0.4),
    )
    .with_description("Pandemic-induced market volatility and economic disruption")
    .with_probability(0.02)
}

/// European sovereign debt crisis calibration.
pub fn eu_debt_crisis_2011() -> StressScenario {
    StressScenario::new(
        "eu_debt_2011",
        "European Sovereign Debt Crisis",
        ScenarioSeverity::Severe,
        3.0,
        ShockParameters::none()
            .with_equity_shock(-0.25)
            .with_credit_spread_bp(500.0)
            .with_fx_shock(0.15)
            .with_correlation_shift(0.25),
    )
    .with_description("Sovereign debt crisis with contagion effects")
    .with_probability(0.015)
}

/// The full historical scenario library.
pub fn historical_scenarios() -> Vec<StressScenario> {
    vec![
        financial_crisis_2008(),
        covid_crash_2020(),
        eu_debt_crisis_2011(),
    ]
}

/// Interest-rate shock at the given severity (100/200/400/600bp).
pub fn interest_rate_shock(severity: ScenarioSeverity) -> StressScenario {
    let bp = [100.0, 200.0, 400.0, 600.0][severity.index()];
    StressScenario::new(
        format!("ir_shock_{:?}", severity).to_lowercase(),
        format!("Interest Rate Shock +{}bp", bp),
        severity,
        1.0,
        ShockParameters::none().with_rate_shift_bp(bp),
    )
}

/// Equity market crash at the given severity (-15/-25/-40/-60%), with the
/// volatility multiplier scaling up the tiers.
pub fn equity_crash(severity: ScenarioSeverity) -> StressScenario {
    let shock = [-0.15, -0.25, -0.40, -0.60][severity.index()];
    let vol_multiplier = 1.5 + 0.5 * severity.index() as f64;
    StressScenario::new(
        format!("equity_crash_{:?}", severity).to_lowercase(),
        format!("Equity Market Crash {:.0}%", shock * 100.0),
        severity,
        1.0,
        ShockParameters::none()
            .with_equity_shock(shock)
            .with_volatility_multiplier(vol_multiplier),
    )
}

/// Credit crisis at the given severity (150/300/500/800bp widening).
pub fn credit_crisis(severity: ScenarioSeverity) -> StressScenario {
    let bp = [150.0, 300.0, 500.0, 800.0][severity.index()];
    StressScenario::new(
        format!("credit_crisis_{:?}", severity).to_lowercase(),
        format!("Credit Crisis +{}bp", bp),
        severity,
        1.0,
        ShockParameters::none().with_credit_spread_bp(bp),
    )
}
