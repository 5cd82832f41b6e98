use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A historical closing price for one instrument, in the instrument's
/// own currency. External input, read-only to the engine.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriceSnapshot {
    pub instrument_id: String,
    pub date: NaiveDate,
    pub price: Decimal,
    pub currency: String,
}

impl PriceSnapshot {
    pub fn new(instrument_id: &str, date: NaiveDate, price: Decimal, currency: &str) -> Self {
        PriceSnapshot {
            instrument_id: instrument_id.to_string(),
            date,
            price,
            currency: currency.to_string(),
        }
    }
}
