use crate::errors::Result;
use crate::fx::CurrencyConverter;
use crate::lots::Lot;
use crate::market_data::PriceTable;
use crate::valuation::Position;

use chrono::NaiveDate;
use log::{debug, warn};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Marks open lots to market as of `as_of_date`.
///
/// For each held instrument the latest price on or before the date is used;
/// the market value is converted to base currency at `as_of_date`. A held
/// instrument without any usable price is flagged `stale` and carried at
/// cost. A missing FX rate for a priced foreign instrument is a hard error
/// and fails the valuation.
///
/// Output is sorted by instrument id so repeated runs serialize
/// byte-identically.
pub fn calculate_positions(
    open_lots: &[Lot],
    prices: &PriceTable,
    converter: &CurrencyConverter,
    base_currency: &str,
    as_of_date: NaiveDate,
) -> Result<Vec<Position>> {
    // instrument -> (quantity, cost basis), ordered for determinism.
    let mut holdings: BTreeMap<&str, (Decimal, Decimal)> = BTreeMap::new();
    for lot in open_lots.iter().filter(|lot| lot.is_open()) {
        let entry = holdings
            .entry(lot.instrument_id.as_str())
            .or_insert((Decimal::ZERO, Decimal::ZERO));
        entry.0 += lot.quantity_remaining;
        entry.1 += lot.cost_basis_remaining();
    }

    let mut positions = Vec::with_capacity(holdings.len());
    for (instrument_id, (quantity, cost_basis)) in holdings {
        let position = match prices.get_price(instrument_id, as_of_date) {
            Some(snapshot) => {
                let market_value = converter.convert_amount(
                    snapshot.price * quantity,
                    &snapshot.currency,
                    base_currency,
                    as_of_date,
                )?;
                debug!(
                    "Valued {} x {} at {} ({}) as of {}",
                    quantity, instrument_id, snapshot.price, snapshot.date, as_of_date
                );
                Position {
                    instrument_id: instrument_id.to_string(),
                    quantity,
                    market_value,
                    cost_basis,
                    unrealized_pnl: market_value - cost_basis,
                    stale: false,
                    price_date: Some(snapshot.date),
                }
            }
            None => {
                warn!(
                    "No price for held instrument {} at or before {}. Carrying at cost.",
                    instrument_id, as_of_date
                );
                Position {
                    instrument_id: instrument_id.to_string(),
                    quantity,
                    market_value: cost_basis,
                    cost_basis,
                    unrealized_pnl: Decimal::ZERO,
                    stale: true,
                    price_date: None,
                }
            }
        };
        positions.push(position);
    }

    Ok(positions)
}

/// Total portfolio market value in base currency as of a date.
pub fn total_market_value(positions: &[Position]) -> Decimal {
    positions.iter().map(|p| p.market_value).sum()
}
