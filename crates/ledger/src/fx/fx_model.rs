use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A historical exchange rate quote, supplied read-only by the market-data
/// collaborator.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FxRate {
    pub from_currency: String,
    pub to_currency: String,
    pub date: NaiveDate,
    #[serde(serialize_with = "serialize_decimal_6")]
    pub rate: Decimal,
}

impl FxRate {
    pub fn new(from: &str, to: &str, date: NaiveDate, rate: Decimal) -> Self {
        FxRate {
            from_currency: from.to_string(),
            to_currency: to.to_string(),
            date,
            rate,
        }
    }
}

fn serialize_decimal_6<S>(decimal: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let rounded = decimal.round_dp(6);
    serializer.serialize_str(&rounded.to_string())
}
