use crate::market_data::PriceSnapshot;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

/// Pre-loaded, immutable price history for the instruments a ledger run
/// touches. The calculation stages read from it synchronously; no network
/// or database access happens mid-computation.
pub struct PriceTable {
    /// instrument_id -> date-ordered price history.
    prices: HashMap<String, BTreeMap<NaiveDate, PriceSnapshot>>,
}

impl PriceTable {
    pub fn new(snapshots: Vec<PriceSnapshot>) -> Self {
        let mut prices: HashMap<String, BTreeMap<NaiveDate, PriceSnapshot>> = HashMap::new();
        for snapshot in snapshots {
            prices
                .entry(snapshot.instrument_id.clone())
                .or_default()
                .insert(snapshot.date, snapshot);
        }
        PriceTable { prices }
    }

    /// Latest price snapshot on or before `date`, or `None` when the
    /// instrument has no usable history. Absence is not an error here;
    /// the valuation engine flags the position as stale instead.
    pub fn get_price(&self, instrument_id: &str, date: NaiveDate) -> Option<&PriceSnapshot> {
        self.prices
            .get(instrument_id)?
            .range(..=date)
            .next_back()
            .map(|(_, snapshot)| snapshot)
    }
}
