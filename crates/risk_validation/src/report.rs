//! Aggregate validation reports and model-risk assessment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backtest::{BacktestReport, TestVerdict, TrafficLight, ValidationTestResult};

/// Risk score added per failed statistical test.
const FAILED_TEST_SCORE: f64 = 20.0;
/// Risk score added per red-zone backtest.
const RED_ZONE_SCORE: f64 = 30.0;

/// Overall model risk classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelRiskBand {
    /// Score below 20.
    Low,
    /// Score in [20, 50).
    Medium,
    /// Score in [50, 80).
    High,
    /// Score of 80 and above.
    Critical,
}

/// Model-risk assessment derived from validation outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRiskAssessment {
    /// Risk score on a 0-100 scale.
    pub score: f64,
    /// Risk band of the score.
    pub band: ModelRiskBand,
    /// Human-readable factors driving the score.
    pub factors: Vec<String>,
    /// Whether the model is approved for use (low or medium risk).
    pub approved: bool,
}

/// Comprehensive model validation report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelValidationReport {
    /// Name of the model under validation.
    pub model_name: String,
    /// Overall verdict across all tests.
    pub overall: TestVerdict,
    /// VaR backtests that fed the report.
    pub backtests: Vec<BacktestReport>,
    /// Individual statistical test results.
    pub statistical_tests: Vec<ValidationTestResult>,
    /// Derived model-risk assessment.
    pub model_risk: ModelRiskAssessment,
    /// When the report was generated.
    pub created_at: DateTime<Utc>,
}

/// Build a validation report from test and backtest results.
///
/// The overall verdict is `Pass` with no failures, `Warning` with at most
/// two failures and three warnings, and `Fail` beyond that.
pub fn validation_report(
    model_name: impl Into<String>,
    statistical_tests: Vec<ValidationTestResult>,
    backtests: Vec<BacktestReport>,
) -> ModelValidationReport {
    let failed = statistical_tests
        .iter()
        .filter(|t| t.verdict == TestVerdict::Fail)
        .count();
    let warned = statistical_tests
        .iter()
        .filter(|t| t.verdict == TestVerdict::Warning)
        .count();

    let overall = if failed == 0 {
        TestVerdict::Pass
    } else if failed <= 2 && warned <= 3 {
        TestVerdict::Warning
    } else {
        TestVerdict::Fail
    };

    let model_risk = assess_model_risk(&statistical_tests, &backtests);

    ModelValidationReport {
        model_name: model_name.into(),
        overall,
        backtests,
        statistical_tests,
        model_risk,
        created_at: Utc::now(),
    }
}

/// Score model risk from failed tests and red-zone backtests.
///
/// 20 points per failed statistical test and 30 per red-zone backtest,
/// capped at 100; bands at 20/50/80. Low and medium risk are approved.
pub fn assess_model_risk(
    statistical_tests: &[ValidationTestResult],
    backtests: &[BacktestReport],
) -> ModelRiskAssessment {
    let mut score = 0.0;
    let mut factors = Vec::new();

    let failed: Vec<&ValidationTestResult> = statistical_tests
        .iter()
        .filter(|t| t.verdict == TestVerdict::Fail)
        .collect();
    if !failed.is_empty() {
        score += failed.len() as f64 * FAILED_TEST_SCORE;
        factors.push(format!("{} validation tests failed", failed.len()));
    }

    let red_zone = backtests
        .iter()
        .filter(|b| b.traffic_light == TrafficLight::Red)
        .count();
    if red_zone > 0 {
        score += red_zone as f64 * RED_ZONE_SCORE;
        factors.push(format!("{} backtests in the Basel red zone", red_zone));
    }

    let yellow_zone = backtests
        .iter()
        .filter(|b| b.traffic_light == TrafficLight::Yellow)
        .count();
    if yellow_zone > 0 {
        factors.push(format!("{} backtests in the Basel yellow zone", yellow_zone));
    }

    let score = score.min(100.0);
    let band = if score < 20.0 {
        ModelRiskBand::Low
    } else if score < 50.0 {
        ModelRiskBand::Medium
    } else if score < 80.0 {
        ModelRiskBand::High
    } else {
        ModelRiskBand::Critical
    };

    ModelRiskAssessment {
        score,
        band,
        factors,
        approved: matches!(band, ModelRiskBand::Low | ModelRiskBand::Medium),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::{backtest_var_model, kupiec_test};
    use risk_core::types::ConfidenceLevel;

    fn passing_test() -> ValidationTestResult {
        let violations: Vec<bool> = (0..250).map(|i| i % 20 == 0).collect();
        kupiec_test(&violations, ConfidenceLevel::C95, 0.05).unwrap()
    }

    fn failing_test() -> ValidationTestResult {
        let violations: Vec<bool> = (0..250).map(|i| i % 4 == 0).collect();
        kupiec_test(&violations, ConfidenceLevel::C95, 0.05).unwrap()
    }

    fn green_backtest() -> BacktestReport {
        let returns: Vec<f64> = (0..250)
            .map(|i| if i % 20 == 0 { -0.05 } else { 0.01 })
            .collect();
        backtest_var_model(&returns, &vec![0.02; 250], ConfidenceLevel::C95).unwrap()
    }

    fn red_backtest() -> BacktestReport {
        let returns: Vec<f64> = (0..250)
            .map(|i| if i % 8 == 0 { -0.05 } else { 0.01 })
            .collect();
        backtest_var_model(&returns, &vec![0.02; 250], ConfidenceLevel::C95).unwrap()
    }

    #[test]
    fn test_fixture_zones() {
        assert_eq!(green_backtest().traffic_light, TrafficLight::Green);
        assert_eq!(red_backtest().traffic_light, TrafficLight::Red);
    }

    #[test]
    fn test_all_passing_report() {
        let report = validation_report(
            "var_model",
            vec![passing_test(), passing_test()],
            vec![green_backtest()],
        );
        assert_eq!(report.overall, TestVerdict::Pass);
        assert_eq!(report.model_risk.band, ModelRiskBand::Low);
        assert_eq!(report.model_risk.score, 0.0);
        assert!(report.model_risk.approved);
        assert!(report.model_risk.factors.is_empty());
    }

    #[test]
    fn test_some_failures_is_warning() {
        let report = validation_report(
            "var_model",
            vec![passing_test(), failing_test()],
            vec![green_backtest()],
        );
        assert_eq!(report.overall, TestVerdict::Warning);
        assert_eq!(report.model_risk.score, 20.0);
        assert_eq!(report.model_risk.band, ModelRiskBand::Medium);
        assert!(report.model_risk.approved);
    }

    #[test]
    fn test_many_failures_is_fail() {
        let report = validation_report(
            "var_model",
            vec![failing_test(), failing_test(), failing_test()],
            vec![],
        );
        assert_eq!(report.overall, TestVerdict::Fail);
        assert_eq!(report.model_risk.score, 60.0);
        assert_eq!(report.model_risk.band, ModelRiskBand::High);
        assert!(!report.model_risk.approved);
    }

    #[test]
    fn test_red_zone_drives_score() {
        let assessment = assess_model_risk(&[], &[red_backtest()]);
        assert_eq!(assessment.score, 30.0);
        assert_eq!(assessment.band, ModelRiskBand::Medium);
        assert!(assessment
            .factors
            .iter()
            .any(|f| f.contains("red zone")));
    }

    #[test]
    fn test_score_caps_at_hundred() {
        let tests: Vec<ValidationTestResult> = (0..6).map(|_| failing_test()).collect();
        let assessment = assess_model_risk(&tests, &[red_backtest()]);
        assert_eq!(assessment.score, 100.0);
        assert_eq!(assessment.band, ModelRiskBand::Critical);
        assert!(!assessment.approved);
    }

    #[test]
    fn test_band_boundaries() {
        // One failed test: 20 points lands exactly on the medium boundary
        let assessment = assess_model_risk(&[failing_test()], &[]);
        assert_eq!(assessment.band, ModelRiskBand::Medium);
    }

    #[test]
    fn test_report_serde_roundtrip() {
        let report = validation_report("var_model", vec![passing_test()], vec![green_backtest()]);
        let json = serde_json::to_string(&report).unwrap();
        let back: ModelValidationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}
