use crate::errors::FxError;
use crate::fx::fx_model::FxRate;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// A calculator for currency conversions over a pre-loaded, immutable set of
/// historical rates. Rates are stored as independent time-series per pair;
/// cross rates are resolved on demand through the currency graph.
///
/// Lookups use the exact-date rate when present, otherwise the latest rate
/// strictly before the requested date. Forward-looking rates are never used,
/// so a conversion as of date D depends only on data available at D.
pub struct CurrencyConverter {
    /// Graph adjacency list: Currency -> Set of connected currencies.
    adj: HashMap<String, HashSet<String>>,

    /// Rate data per (from, to) pair. BTreeMap gives O(log N) date lookup.
    rates: HashMap<(String, String), BTreeMap<NaiveDate, Decimal>>,
}

impl CurrencyConverter {
    /// Creates a new `CurrencyConverter` from historical rates.
    pub fn new(fx_rates: Vec<FxRate>) -> Self {
        let mut converter = CurrencyConverter {
            adj: HashMap::new(),
            rates: HashMap::new(),
        };
        converter.add_historical_rates(fx_rates);
        converter
    }

    /// Adds historical FX rates. Automatically stores inverses and maintains
    /// graph connectivity. Zero rates are skipped rather than inverted.
    pub fn add_historical_rates(&mut self, fx_rates: Vec<FxRate>) {
        for rate in fx_rates {
            if rate.from_currency == rate.to_currency {
                continue;
            }

            let forward_pair = (rate.from_currency.clone(), rate.to_currency.clone());
            let inverse_pair = (rate.to_currency.clone(), rate.from_currency.clone());

            self.rates
                .entry(forward_pair)
                .or_default()
                .insert(rate.date, rate.rate);

            self.adj
                .entry(rate.from_currency.clone())
                .or_default()
                .insert(rate.to_currency.clone());

            if !rate.rate.is_zero() {
                let inverse_rate = Decimal::ONE / rate.rate;
                self.rates
                    .entry(inverse_pair)
                    .or_default()
                    .insert(rate.date, inverse_rate);

                self.adj
                    .entry(rate.to_currency)
                    .or_default()
                    .insert(rate.from_currency);
            }
        }
    }

    /// Finds the direct rate between two connected currencies as of `date`:
    /// exact date if quoted, otherwise the latest quote strictly before it.
    fn get_direct_rate(&self, from: &str, to: &str, date: NaiveDate) -> Option<Decimal> {
        let key = (from.to_string(), to.to_string());
        let history = self.rates.get(&key)?;
        history.range(..=date).next_back().map(|(_, rate)| *rate)
    }

    /// Converts an amount between currencies as of a given date.
    ///
    /// Same-currency conversions return the amount unchanged without a
    /// lookup. Cross rates are found via breadth-first search so that e.g.
    /// USD->RUB can be derived from USD->EUR and EUR->RUB.
    pub fn convert_amount(
        &self,
        amount: Decimal,
        from_currency: &str,
        to_currency: &str,
        date: NaiveDate,
    ) -> Result<Decimal, FxError> {
        if from_currency == to_currency {
            return Ok(amount);
        }

        // BFS state: (current currency, accumulated rate)
        let mut queue: VecDeque<(String, Decimal)> = VecDeque::new();
        let mut visited: HashSet<String> = HashSet::new();

        queue.push_back((from_currency.to_string(), Decimal::ONE));
        visited.insert(from_currency.to_string());

        while let Some((current_curr, current_rate)) = queue.pop_front() {
            if current_curr == to_currency {
                return Ok(amount * current_rate);
            }

            if let Some(neighbors) = self.adj.get(&current_curr) {
                // Sorted neighbor order keeps path selection deterministic
                // when multiple same-length paths exist.
                let mut sorted: Vec<&String> = neighbors.iter().collect();
                sorted.sort();
                for neighbor in sorted {
                    if !visited.contains(neighbor) {
                        if let Some(rate) = self.get_direct_rate(&current_curr, neighbor, date) {
                            visited.insert(neighbor.clone());
                            queue.push_back((neighbor.clone(), current_rate * rate));
                        }
                    }
                }
            }
        }

        Err(FxError::MissingRate {
            from: from_currency.to_string(),
            to: to_currency.to_string(),
            date,
        })
    }

    /// Single-unit rate as of a date.
    pub fn get_rate(
        &self,
        from_currency: &str,
        to_currency: &str,
        date: NaiveDate,
    ) -> Result<Decimal, FxError> {
        self.convert_amount(Decimal::ONE, from_currency, to_currency, date)
    }
}
