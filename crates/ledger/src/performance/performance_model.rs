use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Total portfolio value in base currency at one sub-period boundary.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValuationPoint {
    pub date: NaiveDate,
    pub total_value: Decimal,
}

/// Time-weighted return plus the underlying sub-period return series
/// (reused for Sharpe).
#[derive(Debug, Clone, PartialEq)]
pub struct TwrResult {
    pub twr: Decimal,
    pub sub_period_returns: Vec<Decimal>,
}

/// Explicit configuration for the performance calculator. Passed in by the
/// caller; nothing here is read from globals or the clock.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSettings {
    /// Risk-free rate per sub-period, for the Sharpe numerator.
    pub risk_free_rate: Decimal,
    /// Annualization base for Sharpe: stdev is scaled by
    /// sqrt(periods_per_year).
    pub periods_per_year: u32,
}

impl Default for PerformanceSettings {
    fn default() -> Self {
        PerformanceSettings {
            risk_free_rate: Decimal::ZERO,
            periods_per_year: 12,
        }
    }
}

/// Portfolio performance over the requested range. `xirr` and `sharpe` are
/// `None` when not computable (non-convergence, too few periods) — never
/// fabricated zeros.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub twr: Decimal,
    pub xirr: Option<Decimal>,
    pub sharpe: Option<Decimal>,
}
