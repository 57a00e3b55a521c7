//! # risk_validation: Model Validation & Backtesting
//!
//! Statistical hypothesis tests comparing model-implied risk estimates
//! against realized outcomes:
//!
//! - **Kupiec POF**: likelihood-ratio test of the violation rate against
//!   the expected rate, chi-square(1)
//! - **Christoffersen**: adds a Markov-transition independence statistic
//!   for a combined coverage-and-independence test, chi-square(2)
//! - **Basel traffic light**: green/yellow/red classification of the
//!   violation count
//! - **Distributional diagnostics**: Jarque–Bera, Kolmogorov–Smirnov,
//!   Ljung–Box, and ARCH-LM on residual series
//!
//! Every test returns a [`ValidationTestResult`] with its statistic,
//! p-value, critical value, verdict, and a supporting detail map; an
//! aggregate report classifies overall model risk from the count and
//! severity of failures.

mod backtest;
mod diagnostics;
mod error;
mod report;

pub use backtest::{
    backtest_var_model, christoffersen_test, kupiec_test, violation_series, BacktestReport,
    TestKind, TestVerdict, TrafficLight, ValidationTestResult,
};
pub use diagnostics::{arch_lm, jarque_bera, kolmogorov_smirnov, ljung_box, run_diagnostics};
pub use error::ValidationError;
pub use report::{
    assess_model_risk, validation_report, ModelRiskAssessment, ModelRiskBand,
    ModelValidationReport,
};

pub use risk_core::types::ConfidenceLevel;
