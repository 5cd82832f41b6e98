use crate::constants::{
    DAYS_PER_YEAR, DECIMAL_PRECISION, XIRR_INITIAL_GUESS, XIRR_MAX_ITERATIONS, XIRR_TOLERANCE,
};
use crate::errors::{Error, PerformanceError, Result};
use crate::performance::{PerformanceSettings, TwrResult, ValuationPoint};
use crate::transactions::CashFlow;
use crate::utils::CancelToken;

use chrono::NaiveDate;
use log::{debug, warn};
use num_traits::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, MathematicalOps};
use std::collections::HashMap;

/// Time-weighted return over a valuation series whose points sit at every
/// external cash-flow date (plus range start and end).
///
/// Each sub-period return is `(V_end - CF) / V_start - 1` with `CF` the
/// external flow booked on the end date, so the result is neutral to the
/// timing and size of deposits and withdrawals.
pub fn calculate_twr(
    series: &[ValuationPoint],
    flows: &[CashFlow],
    cancel: &CancelToken,
) -> Result<TwrResult> {
    if series.len() < 2 {
        warn!(
            "TWR: not enough valuation points ({}). Returning zero return.",
            series.len()
        );
        return Ok(TwrResult {
            twr: Decimal::ZERO,
            sub_period_returns: Vec::new(),
        });
    }

    let mut flows_by_date: HashMap<NaiveDate, Decimal> = HashMap::new();
    for flow in flows {
        *flows_by_date.entry(flow.date).or_insert(Decimal::ZERO) += flow.signed_amount();
    }

    let mut sub_period_returns = Vec::with_capacity(series.len() - 1);
    let mut cumulative = Decimal::ONE;

    for window in series.windows(2) {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let prev = &window[0];
        let curr = &window[1];

        let cash_flow = flows_by_date
            .get(&curr.date)
            .copied()
            .unwrap_or(Decimal::ZERO);

        let period_return = if prev.total_value.is_zero() {
            Decimal::ZERO
        } else {
            (curr.total_value - cash_flow) / prev.total_value - Decimal::ONE
        };

        cumulative *= Decimal::ONE + period_return;
        sub_period_returns.push(period_return);
    }

    Ok(TwrResult {
        twr: (cumulative - Decimal::ONE).round_dp(DECIMAL_PRECISION),
        sub_period_returns,
    })
}

/// Money-weighted rate of return for an irregular series of dated flows,
/// signed from the investor's perspective (contributions negative,
/// withdrawals and the terminal valuation positive).
///
/// Solved with bounded Newton-Raphson (initial guess 0.1, tolerance 1e-7,
/// 100 iterations) falling back to bisection; explicit loops only, so
/// termination is guaranteed. Raises `XirrDidNotConverge` when neither
/// method lands — a fabricated rate is never returned.
pub fn calculate_xirr(cash_flows: &[(NaiveDate, Decimal)], cancel: &CancelToken) -> Result<Decimal> {
    if cash_flows.len() < 2 {
        return Err(PerformanceError::InsufficientHistory(cash_flows.len()).into());
    }

    let t0 = cash_flows[0].0;
    let flows: Vec<(f64, f64)> = cash_flows
        .iter()
        .map(|(date, amount)| {
            (
                (*date - t0).num_days() as f64 / DAYS_PER_YEAR,
                amount.to_f64().unwrap_or(0.0),
            )
        })
        .collect();

    let npv = |rate: f64| -> f64 {
        flows
            .iter()
            .map(|(t, a)| a / (1.0 + rate).powf(*t))
            .sum()
    };
    let npv_derivative = |rate: f64| -> f64 {
        flows
            .iter()
            .map(|(t, a)| -a * t / (1.0 + rate).powf(t + 1.0))
            .sum()
    };

    // Newton-Raphson from the standard starting guess.
    let mut rate = XIRR_INITIAL_GUESS;
    for iteration in 0..XIRR_MAX_ITERATIONS {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let value = npv(rate);
        if value.abs() < XIRR_TOLERANCE {
            debug!("XIRR converged to {} after {} iterations", rate, iteration);
            return finish_xirr(rate);
        }

        let derivative = npv_derivative(rate);
        if derivative.abs() < f64::EPSILON {
            break; // flat derivative, hand over to bisection
        }

        let next = rate - value / derivative;
        if !next.is_finite() || next <= -1.0 {
            break; // diverged out of the valid domain
        }
        if (next - rate).abs() < XIRR_TOLERANCE {
            return finish_xirr(next);
        }
        rate = next;
    }

    // Bisection fallback over a wide but bounded bracket.
    let mut low = -0.9999;
    let mut high = 10.0;
    let (npv_low, npv_high) = (npv(low), npv(high));
    if npv_low.is_finite() && npv_high.is_finite() && npv_low * npv_high <= 0.0 {
        let mut mid = rate;
        for _ in 0..200 {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            mid = (low + high) / 2.0;
            let value = npv(mid);
            if value.abs() < XIRR_TOLERANCE || (high - low) / 2.0 < XIRR_TOLERANCE {
                return finish_xirr(mid);
            }
            if npv(low) * value < 0.0 {
                high = mid;
            } else {
                low = mid;
            }
        }
        rate = mid;
    }

    warn!("XIRR failed to converge (last estimate {})", rate);
    Err(PerformanceError::XirrDidNotConverge {
        iterations: XIRR_MAX_ITERATIONS,
        last_estimate: rate,
    }
    .into())
}

fn finish_xirr(rate: f64) -> Result<Decimal> {
    if !rate.is_finite() {
        return Err(PerformanceError::XirrDidNotConverge {
            iterations: XIRR_MAX_ITERATIONS,
            last_estimate: rate,
        }
        .into());
    }
    Decimal::from_f64(rate)
        .map(|d| d.round_dp(DECIMAL_PRECISION))
        .ok_or_else(|| {
            PerformanceError::XirrDidNotConverge {
                iterations: XIRR_MAX_ITERATIONS,
                last_estimate: rate,
            }
            .into()
        })
}

/// Annualized Sharpe ratio over the TWR sub-period returns. `None` (not
/// zero) when fewer than two periods exist or the return series has no
/// variance.
pub fn calculate_sharpe(
    sub_period_returns: &[Decimal],
    settings: &PerformanceSettings,
) -> Option<Decimal> {
    if sub_period_returns.len() < 2 {
        return None;
    }

    let count = Decimal::from(sub_period_returns.len());
    let mean = sub_period_returns.iter().sum::<Decimal>() / count;

    let sum_squared_diff: Decimal = sub_period_returns
        .iter()
        .map(|&r| {
            let diff = r - mean;
            diff * diff
        })
        .sum();
    let variance = sum_squared_diff / (count - Decimal::ONE);
    let stdev = variance.sqrt()?;
    if stdev.is_zero() {
        return None;
    }

    let annualization = Decimal::from(settings.periods_per_year).sqrt()?;
    let sharpe = (mean - settings.risk_free_rate) / stdev * annualization;
    Some(sharpe.round_dp(DECIMAL_PRECISION))
}
