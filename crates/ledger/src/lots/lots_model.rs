use crate::constants::QUANTITY_THRESHOLD;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An open (or audit-retained consumed) purchase lot.
///
/// Created by a buy or in-kind deposit; `quantity_remaining` only ever
/// decreases, driven by the FIFO matcher processing later disposals in
/// trade-date order. Fully consumed lots are retained with a remaining
/// quantity of zero and excluded from valuation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Lot {
    pub instrument_id: String,
    pub account_id: String,
    pub open_date: NaiveDate,
    pub quantity_remaining: Decimal,
    /// Cost per unit in the portfolio base currency, fees included.
    pub unit_cost: Decimal,
    pub source_transaction_id: String,
}

impl Lot {
    pub fn is_open(&self) -> bool {
        self.quantity_remaining >= QUANTITY_THRESHOLD
    }

    /// Remaining cost basis in base currency.
    pub fn cost_basis_remaining(&self) -> Decimal {
        self.quantity_remaining * self.unit_cost
    }
}

/// P&L realized by one disposal transaction. A single sell may close
/// several lots; the event aggregates them. Immutable once created.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RealizedEvent {
    pub instrument_id: String,
    pub account_id: String,
    pub close_date: NaiveDate,
    pub quantity: Decimal,
    /// Net proceeds in base currency (gross minus fee).
    pub proceeds: Decimal,
    /// FIFO cost basis of the consumed lots in base currency.
    pub cost_basis: Decimal,
    pub realized_pnl: Decimal,
    /// Days held, measured from the youngest lot the disposal consumed.
    /// The minimum holding period keeps long-term relief conservative.
    pub holding_period_days: i64,
}
