use crate::errors::{Result, TaxError};
use crate::lots::RealizedEvent;
use crate::taxes::{AccountType, IncomeEvent, IncomeKind, TaxRules, TaxSummary, TaxYearSummary};
use crate::transactions::{CashFlow, FlowDirection};

use chrono::Datelike;
use log::debug;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Applies Russian NDFL rules to realized events and income, aggregated per
/// calendar tax year.
///
/// Everything is computed from the supplied events and rules; the tax-year
/// boundary comes from event dates, never from the wall clock.
#[derive(Debug)]
pub struct TaxCalculator {
    rules: TaxRules,
}

impl TaxCalculator {
    /// Validates the rule set up front; a calculator never exists with
    /// rules it cannot apply.
    pub fn new(rules: TaxRules) -> Result<Self> {
        if rules.base_rate < Decimal::ZERO
            || rules.base_rate > Decimal::ONE
            || rules.higher_rate < rules.base_rate
            || rules.higher_rate > Decimal::ONE
        {
            return Err(TaxError::InvalidRules(format!(
                "rates out of range: base {}, higher {}",
                rules.base_rate, rules.higher_rate
            ))
            .into());
        }
        if !rules.higher_rate_threshold.is_sign_positive() {
            return Err(TaxError::InvalidRules(format!(
                "non-positive progressive threshold {}",
                rules.higher_rate_threshold
            ))
            .into());
        }
        if rules.ldv_min_holding_days <= 0 {
            return Err(TaxError::InvalidRules(format!(
                "non-positive LDV holding period {} days",
                rules.ldv_min_holding_days
            ))
            .into());
        }
        if rules.ldv_cap_per_year.is_sign_negative()
            || rules.iis_a_deduction_cap.is_sign_negative()
        {
            return Err(TaxError::InvalidRules(format!(
                "negative cap: LDV {}, IIS A {}",
                rules.ldv_cap_per_year, rules.iis_a_deduction_cap
            ))
            .into());
        }
        Ok(TaxCalculator { rules })
    }

    /// Computes the per-year tax summary.
    ///
    /// `contributions` are the portfolio's external cash flows; only
    /// inflows matter, and only for the IIS type A deduction figure.
    pub fn calculate(
        &self,
        realized_events: &[RealizedEvent],
        income: &[IncomeEvent],
        contributions: &[CashFlow],
        account_type: AccountType,
    ) -> TaxSummary {
        let mut years: BTreeMap<i32, TaxYearSummary> = BTreeMap::new();

        for event in realized_events {
            let entry = self.year_entry(&mut years, event.close_date.year());
            entry.realized_gain += event.realized_pnl;
            entry.ldv_relief += self.ldv_relief(event);
        }

        for payment in income {
            let entry = self.year_entry(&mut years, payment.date.year());
            match payment.kind {
                IncomeKind::Dividend => entry.dividend_income += payment.amount,
                IncomeKind::Coupon => entry.coupon_income += payment.amount,
            }
        }

        for flow in contributions {
            if flow.direction == FlowDirection::In {
                let entry = self.year_entry(&mut years, flow.date.year());
                if account_type == AccountType::IisTypeA {
                    entry.iis_deduction_eligible = (entry.iis_deduction_eligible + flow.amount)
                        .min(self.rules.iis_a_deduction_cap);
                }
            }
        }

        for entry in years.values_mut() {
            entry.taxable_gain = match account_type {
                AccountType::Standard => {
                    (entry.realized_gain - entry.ldv_relief).max(Decimal::ZERO)
                }
                // Type A defers gain taxation to account close; type B
                // exempts gains outright. Either way nothing is owed on
                // gains through this engine.
                AccountType::IisTypeA | AccountType::IisTypeB => Decimal::ZERO,
            };
            entry.taxable_base = entry.taxable_gain + entry.dividend_income + entry.coupon_income;
            entry.tax_due = self.progressive_tax(entry.taxable_base);
            debug!(
                "Tax year {}: base {} -> due {}",
                entry.year, entry.taxable_base, entry.tax_due
            );
        }

        TaxSummary {
            account_type,
            years: years.into_values().collect(),
        }
    }

    fn year_entry<'a>(
        &self,
        years: &'a mut BTreeMap<i32, TaxYearSummary>,
        year: i32,
    ) -> &'a mut TaxYearSummary {
        years.entry(year).or_insert_with(|| TaxYearSummary {
            year,
            realized_gain: Decimal::ZERO,
            ldv_relief: Decimal::ZERO,
            dividend_income: Decimal::ZERO,
            coupon_income: Decimal::ZERO,
            taxable_gain: Decimal::ZERO,
            taxable_base: Decimal::ZERO,
            tax_due: Decimal::ZERO,
            iis_deduction_eligible: Decimal::ZERO,
        })
    }

    /// Long-term ownership relief for one disposal: positive gains on
    /// qualifying instruments held past the statutory minimum are exempt,
    /// capped at `ldv_cap_per_year` per full year of ownership.
    fn ldv_relief(&self, event: &RealizedEvent) -> Decimal {
        if event.realized_pnl <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        if event.holding_period_days < self.rules.ldv_min_holding_days {
            return Decimal::ZERO;
        }
        if let Some(qualifying) = &self.rules.ldv_qualifying_instruments {
            if !qualifying.contains(&event.instrument_id) {
                return Decimal::ZERO;
            }
        }

        let full_years = Decimal::from(event.holding_period_days / 365);
        let cap = self.rules.ldv_cap_per_year * full_years;
        event.realized_pnl.min(cap)
    }

    fn progressive_tax(&self, base: Decimal) -> Decimal {
        if base <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let below = base.min(self.rules.higher_rate_threshold);
        let above = (base - self.rules.higher_rate_threshold).max(Decimal::ZERO);
        below * self.rules.base_rate + above * self.rules.higher_rate
    }
}
