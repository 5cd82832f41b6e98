use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A held position marked to market as of a valuation date. Derived on
/// demand from open lots and prices, never stored.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub instrument_id: String,
    pub quantity: Decimal,
    /// Market value in base currency. Falls back to cost basis when no
    /// price exists (see `stale`).
    pub market_value: Decimal,
    /// Remaining FIFO cost basis in base currency.
    pub cost_basis: Decimal,
    pub unrealized_pnl: Decimal,
    /// True when no price snapshot existed at or before the valuation date.
    /// A stale position is shown rather than omitted: dropping it would
    /// misstate total portfolio value more than a stale price does.
    pub stale: bool,
    /// The date of the price actually used, when one was found.
    pub price_date: Option<NaiveDate>,
}
