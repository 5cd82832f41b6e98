use crate::lots::RealizedEvent;
use crate::performance::PerformanceMetrics;
use crate::taxes::TaxSummary;
use crate::valuation::Position;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Non-fatal conditions surfaced alongside a snapshot.
///
/// Anything that would make the numbers wrong (missing FX, oversell) fails
/// the run instead; warnings only cover degraded-but-correct output.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SnapshotWarning {
    /// No price at or before the valuation date; the position is carried
    /// at cost with zero unrealized P&L.
    StalePrice {
        instrument_id: String,
        last_price_date: Option<NaiveDate>,
    },
    /// The money-weighted return solver did not land; `xirr` is `None`.
    XirrUnavailable { detail: String },
}

/// Immutable result of one full ledger run for a portfolio.
///
/// Everything in it is derived from the inputs supplied to the
/// orchestrator; recomputing with the same inputs yields a byte-identical
/// serialization.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    pub portfolio_id: String,
    pub base_currency: String,
    pub as_of_date: NaiveDate,
    /// Open positions, sorted by instrument id.
    pub positions: Vec<Position>,
    /// Closed-lot history up to `as_of_date`, in close-date order.
    pub realized_events: Vec<RealizedEvent>,
    /// Cash across all currencies, converted to base at `as_of_date`.
    pub cash_balance: Decimal,
    /// Positions market value plus cash.
    pub total_value: Decimal,
    pub performance: PerformanceMetrics,
    pub tax_summary: TaxSummary,
    pub warnings: Vec<SnapshotWarning>,
}
