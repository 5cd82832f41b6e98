use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Account tax regime.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    /// Regular brokerage account, standard NDFL treatment.
    Standard,
    /// IIS with the contribution-deduction regime: gains are deferred, the
    /// engine reports a deduction-eligible contribution figure instead.
    IisTypeA,
    /// IIS with the gain-exemption regime: realized gains are exempt.
    IisTypeB,
}

/// Dividend or coupon income in base currency, derived from income
/// transactions by the orchestrator.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IncomeEvent {
    pub instrument_id: Option<String>,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub kind: IncomeKind,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncomeKind {
    Dividend,
    Coupon,
}

/// Explicit NDFL rule set, passed into the tax calculator.
///
/// Keeping the rates and thresholds in a value (rather than module-level
/// constants) lets multi-year rule changes and historical rule sets be
/// computed side by side.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaxRules {
    /// Standard NDFL rate (0.13).
    pub base_rate: Decimal,
    /// Elevated rate (0.15) applied above `higher_rate_threshold`.
    pub higher_rate: Decimal,
    /// Annual taxable-base threshold where the elevated rate starts.
    pub higher_rate_threshold: Decimal,
    /// Minimum holding period for LDV relief, in days (three years).
    pub ldv_min_holding_days: i64,
    /// LDV relief cap per full year of ownership.
    pub ldv_cap_per_year: Decimal,
    /// Annual cap on deduction-eligible IIS type A contributions.
    pub iis_a_deduction_cap: Decimal,
    /// Instruments qualifying for LDV relief. `None` treats every
    /// instrument as qualifying.
    pub ldv_qualifying_instruments: Option<BTreeSet<String>>,
}

impl TaxRules {
    /// Rule set in force for the 2021+ tax years.
    pub fn russia_2021() -> Self {
        TaxRules {
            base_rate: dec!(0.13),
            higher_rate: dec!(0.15),
            higher_rate_threshold: dec!(5000000),
            ldv_min_holding_days: 3 * 365,
            ldv_cap_per_year: dec!(3000000),
            iis_a_deduction_cap: dec!(400000),
            ldv_qualifying_instruments: None,
        }
    }
}

/// Tax figures for one calendar year.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaxYearSummary {
    pub year: i32,
    /// Net realized P&L of the year, before relief.
    pub realized_gain: Decimal,
    /// Gain excluded by long-term ownership relief.
    pub ldv_relief: Decimal,
    pub dividend_income: Decimal,
    pub coupon_income: Decimal,
    /// Taxable realized gain after relief and account-regime exemptions.
    pub taxable_gain: Decimal,
    /// Full taxable base: taxable gain plus income.
    pub taxable_base: Decimal,
    pub tax_due: Decimal,
    /// IIS type A only: contributions eligible for the deduction. Advisory;
    /// applied against other declared income outside this engine.
    pub iis_deduction_eligible: Decimal,
}

/// Per-year tax figures for one account regime, in base currency.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaxSummary {
    pub account_type: AccountType,
    /// Ascending by year.
    pub years: Vec<TaxYearSummary>,
}

impl TaxSummary {
    pub fn total_tax_due(&self) -> Decimal {
        self.years.iter().map(|y| y.tax_due).sum()
    }

    pub fn total_taxable_gain(&self) -> Decimal {
        self.years.iter().map(|y| y.taxable_gain).sum()
    }
}
