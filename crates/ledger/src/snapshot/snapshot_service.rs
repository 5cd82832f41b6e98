use crate::errors::{Error, Result};
use crate::fx::CurrencyConverter;
use crate::lots::{FifoMatcher, Lot, RealizedEvent};
use crate::market_data::PriceTable;
use crate::performance::{calculate_sharpe, calculate_twr, calculate_xirr};
use crate::performance::{PerformanceMetrics, PerformanceSettings, ValuationPoint};
use crate::snapshot::{AnalyticsSnapshot, SnapshotWarning};
use crate::taxes::{AccountType, IncomeEvent, IncomeKind, TaxCalculator, TaxRules, TaxSummary};
use crate::transactions::{
    CashFlow, FlowDirection, Transaction, TransactionRepositoryTrait, TransactionType,
};
use crate::utils::CancelToken;
use crate::valuation::{calculate_positions, total_market_value};

use chrono::NaiveDate;
use dashmap::DashMap;
use log::debug;
use rayon::prelude::*;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

/// Lots, realized events and per-currency cash after replaying a
/// portfolio's transactions up to a boundary date.
struct ReplayState {
    lots: Vec<Lot>,
    realized: Vec<RealizedEvent>,
    cash: BTreeMap<String, Decimal>,
}

/// Drives one full ledger run per portfolio: transactions are pulled from
/// the repository, matched into lots, marked to market, and rolled up into
/// performance and tax figures.
///
/// Runs for the same portfolio are serialized through a per-portfolio
/// mutex; independent portfolios compute in parallel. Completed snapshots
/// are cached by `(portfolio_id, as_of_date)` until invalidated.
pub struct LedgerOrchestrator {
    repository: Arc<dyn TransactionRepositoryTrait>,
    prices: PriceTable,
    converter: CurrencyConverter,
    base_currency: String,
    tax_rules: TaxRules,
    settings: PerformanceSettings,
    account_types: HashMap<String, AccountType>,
    cache: DashMap<(String, NaiveDate), AnalyticsSnapshot>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl LedgerOrchestrator {
    pub fn new(
        repository: Arc<dyn TransactionRepositoryTrait>,
        prices: PriceTable,
        converter: CurrencyConverter,
        base_currency: &str,
        tax_rules: TaxRules,
        settings: PerformanceSettings,
    ) -> Self {
        LedgerOrchestrator {
            repository,
            prices,
            converter,
            base_currency: base_currency.to_string(),
            tax_rules,
            settings,
            account_types: HashMap::new(),
            cache: DashMap::new(),
            locks: DashMap::new(),
        }
    }

    /// Registers the tax regime of a portfolio's account. Portfolios
    /// without an entry are treated as standard brokerage accounts.
    pub fn with_account_type(mut self, portfolio_id: &str, account_type: AccountType) -> Self {
        self.account_types
            .insert(portfolio_id.to_string(), account_type);
        self
    }

    /// Computes (or returns the cached) snapshot of one portfolio as of
    /// `as_of_date`.
    ///
    /// Data problems (oversell, missing FX on a valuation date) fail the
    /// run; stale prices and an unsolvable money-weighted return degrade
    /// to warnings on the snapshot instead.
    pub fn compute_snapshot(
        &self,
        portfolio_id: &str,
        as_of_date: NaiveDate,
        cancel: &CancelToken,
    ) -> Result<AnalyticsSnapshot> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let key = (portfolio_id.to_string(), as_of_date);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached.value().clone());
        }

        let run_lock = {
            let entry = self
                .locks
                .entry(portfolio_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())));
            Arc::clone(entry.value())
        };
        let _guard = run_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // A concurrent run may have filled the cache while we waited.
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached.value().clone());
        }

        let snapshot = self.run_pipeline(portfolio_id, as_of_date, cancel)?;
        self.cache.insert(key, snapshot.clone());
        Ok(snapshot)
    }

    /// Computes snapshots for many portfolios in parallel. Each portfolio
    /// gets its own result; one failing portfolio does not abort the rest.
    pub fn compute_snapshots(
        &self,
        portfolio_ids: &[String],
        as_of_date: NaiveDate,
        cancel: &CancelToken,
    ) -> Vec<(String, Result<AnalyticsSnapshot>)> {
        portfolio_ids
            .par_iter()
            .map(|portfolio_id| {
                (
                    portfolio_id.clone(),
                    self.compute_snapshot(portfolio_id, as_of_date, cancel),
                )
            })
            .collect()
    }

    /// Drops cached snapshots made stale by a transaction change on
    /// `trade_date`: every entry for the portfolio whose as-of date is on
    /// or after the change must be recomputed.
    pub fn invalidate(&self, portfolio_id: &str, trade_date: NaiveDate) {
        self.cache
            .retain(|(pid, as_of), _| pid != portfolio_id || *as_of < trade_date);
    }

    fn run_pipeline(
        &self,
        portfolio_id: &str,
        as_of_date: NaiveDate,
        cancel: &CancelToken,
    ) -> Result<AnalyticsSnapshot> {
        debug!("Ledger run for {} as of {}", portfolio_id, as_of_date);

        let transactions = self.repository.get_transactions(portfolio_id, as_of_date)?;
        let account_type = self
            .account_types
            .get(portfolio_id)
            .copied()
            .unwrap_or(AccountType::Standard);

        if transactions.is_empty() {
            return Ok(Self::empty_snapshot(
                portfolio_id,
                &self.base_currency,
                as_of_date,
                account_type,
            ));
        }
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let state = self.replay(&transactions, as_of_date)?;
        let positions = calculate_positions(
            &state.lots,
            &self.prices,
            &self.converter,
            &self.base_currency,
            as_of_date,
        )?;
        let cash_balance = self.cash_in_base(&state.cash, as_of_date)?;
        let total_value = total_market_value(&positions) + cash_balance;

        let flows = self.external_flows(portfolio_id, &transactions)?;
        let income = self.income_events(&transactions)?;

        let series = self.valuation_series(&transactions, &flows, as_of_date, cancel)?;
        let twr_result = calculate_twr(&series, &flows, cancel)?;
        let sharpe = calculate_sharpe(&twr_result.sub_period_returns, &self.settings);

        let mut warnings: Vec<SnapshotWarning> = positions
            .iter()
            .filter(|position| position.stale)
            .map(|position| SnapshotWarning::StalePrice {
                instrument_id: position.instrument_id.clone(),
                last_price_date: position.price_date,
            })
            .collect();

        // Contributions enter the return stream negative from the
        // investor's standpoint; the terminal valuation closes it out.
        let mut xirr_flows: Vec<(NaiveDate, Decimal)> = flows
            .iter()
            .map(|flow| (flow.date, -flow.signed_amount()))
            .collect();
        xirr_flows.push((as_of_date, total_value));
        xirr_flows.sort_by_key(|(date, _)| *date);

        let xirr = match calculate_xirr(&xirr_flows, cancel) {
            Ok(rate) => Some(rate),
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(Error::Performance(err)) => {
                warnings.push(SnapshotWarning::XirrUnavailable {
                    detail: err.to_string(),
                });
                None
            }
            Err(other) => return Err(other),
        };

        let performance = PerformanceMetrics {
            twr: twr_result.twr,
            xirr,
            sharpe,
        };

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let tax_summary = TaxCalculator::new(self.tax_rules.clone())?.calculate(
            &state.realized,
            &income,
            &flows,
            account_type,
        );

        debug!(
            "Ledger run for {} done: {} positions, {} realized events, total {}",
            portfolio_id,
            positions.len(),
            state.realized.len(),
            total_value
        );

        Ok(AnalyticsSnapshot {
            portfolio_id: portfolio_id.to_string(),
            base_currency: self.base_currency.clone(),
            as_of_date,
            positions,
            realized_events: state.realized,
            cash_balance,
            total_value,
            performance,
            tax_summary,
            warnings,
        })
    }

    /// Replays all transactions up to `as_of`: instrument streams go
    /// through the FIFO matcher per (account, instrument) pair, cash
    /// effects accumulate per currency.
    fn replay(&self, transactions: &[Transaction], as_of: NaiveDate) -> Result<ReplayState> {
        let mut groups: BTreeMap<(String, String), Vec<Transaction>> = BTreeMap::new();
        let mut cash: BTreeMap<String, Decimal> = BTreeMap::new();

        for tx in transactions.iter().filter(|tx| tx.trade_date <= as_of) {
            let effect = Self::cash_effect(tx);
            if !effect.is_zero() {
                *cash.entry(tx.currency.clone()).or_insert(Decimal::ZERO) += effect;
            }
            if let Some(instrument_id) = &tx.instrument_id {
                groups
                    .entry((tx.account_id.clone(), instrument_id.clone()))
                    .or_default()
                    .push(tx.clone());
            }
        }

        let matcher = FifoMatcher::new(&self.converter, &self.base_currency);
        let mut lots: Vec<Lot> = Vec::new();
        let mut realized: Vec<RealizedEvent> = Vec::new();
        for group in groups.values() {
            let outcome = matcher.match_transactions(group)?;
            lots.extend(outcome.lots);
            realized.extend(outcome.realized);
        }
        realized.sort_by(|a, b| {
            (a.close_date, &a.instrument_id, &a.account_id)
                .cmp(&(b.close_date, &b.instrument_id, &b.account_id))
        });

        Ok(ReplayState {
            lots,
            realized,
            cash,
        })
    }

    /// Signed cash effect of one transaction, in the transaction currency.
    fn cash_effect(tx: &Transaction) -> Decimal {
        match tx.kind {
            TransactionType::Deposit => {
                if tx.instrument_id.is_none() {
                    tx.gross_amount() - tx.fee
                } else {
                    Decimal::ZERO
                }
            }
            TransactionType::Withdrawal => {
                if tx.instrument_id.is_none() {
                    -(tx.gross_amount() + tx.fee)
                } else {
                    Decimal::ZERO
                }
            }
            TransactionType::Buy => -(tx.gross_amount() + tx.fee),
            TransactionType::Sell => tx.gross_amount() - tx.fee,
            TransactionType::Dividend | TransactionType::Coupon => tx.gross_amount() - tx.fee,
            TransactionType::Tax | TransactionType::Fee => -(tx.gross_amount() + tx.fee),
            TransactionType::Split | TransactionType::SpinOff | TransactionType::Merger => {
                Decimal::ZERO
            }
        }
    }

    fn cash_in_base(&self, cash: &BTreeMap<String, Decimal>, date: NaiveDate) -> Result<Decimal> {
        let mut total = Decimal::ZERO;
        for (currency, balance) in cash {
            if balance.is_zero() {
                continue;
            }
            total += self
                .converter
                .convert_amount(*balance, currency, &self.base_currency, date)?;
        }
        Ok(total)
    }

    /// External flows in base currency, converted at each flow's trade
    /// date. In-kind transfers count too, valued at their stated transfer
    /// price.
    fn external_flows(
        &self,
        portfolio_id: &str,
        transactions: &[Transaction],
    ) -> Result<Vec<CashFlow>> {
        let mut flows = Vec::new();
        for tx in transactions.iter().filter(|tx| tx.is_external_flow()) {
            let direction = if tx.kind == TransactionType::Deposit {
                FlowDirection::In
            } else {
                FlowDirection::Out
            };
            let amount = self.converter.convert_amount(
                tx.gross_amount(),
                &tx.currency,
                &self.base_currency,
                tx.trade_date,
            )?;
            flows.push(CashFlow {
                portfolio_id: portfolio_id.to_string(),
                date: tx.trade_date,
                amount,
                direction,
            });
        }
        flows.sort_by_key(|flow| flow.date);
        Ok(flows)
    }

    fn income_events(&self, transactions: &[Transaction]) -> Result<Vec<IncomeEvent>> {
        let mut income = Vec::new();
        for tx in transactions {
            let kind = match tx.kind {
                TransactionType::Dividend => IncomeKind::Dividend,
                TransactionType::Coupon => IncomeKind::Coupon,
                _ => continue,
            };
            let amount = self.converter.convert_amount(
                tx.gross_amount() - tx.fee,
                &tx.currency,
                &self.base_currency,
                tx.trade_date,
            )?;
            income.push(IncomeEvent {
                instrument_id: tx.instrument_id.clone(),
                date: tx.trade_date,
                amount,
                kind,
            });
        }
        income.sort_by_key(|event| event.date);
        Ok(income)
    }

    /// Portfolio value at every sub-period boundary: inception, each
    /// external flow date, and the as-of date. Each boundary is a full
    /// replay, so mid-history corporate actions and FX are always applied
    /// with the knowledge available on that date.
    fn valuation_series(
        &self,
        transactions: &[Transaction],
        flows: &[CashFlow],
        as_of_date: NaiveDate,
        cancel: &CancelToken,
    ) -> Result<Vec<ValuationPoint>> {
        let inception = transactions
            .iter()
            .map(|tx| tx.trade_date)
            .min()
            .unwrap_or(as_of_date);

        let mut boundaries: BTreeSet<NaiveDate> = BTreeSet::new();
        boundaries.insert(inception);
        boundaries.insert(as_of_date);
        boundaries.extend(
            flows
                .iter()
                .map(|flow| flow.date)
                .filter(|date| *date >= inception && *date <= as_of_date),
        );

        let mut series = Vec::with_capacity(boundaries.len());
        for date in boundaries {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let state = self.replay(transactions, date)?;
            let positions = calculate_positions(
                &state.lots,
                &self.prices,
                &self.converter,
                &self.base_currency,
                date,
            )?;
            let total_value = total_market_value(&positions) + self.cash_in_base(&state.cash, date)?;
            series.push(ValuationPoint { date, total_value });
        }
        Ok(series)
    }

    fn empty_snapshot(
        portfolio_id: &str,
        base_currency: &str,
        as_of_date: NaiveDate,
        account_type: AccountType,
    ) -> AnalyticsSnapshot {
        AnalyticsSnapshot {
            portfolio_id: portfolio_id.to_string(),
            base_currency: base_currency.to_string(),
            as_of_date,
            positions: Vec::new(),
            realized_events: Vec::new(),
            cash_balance: Decimal::ZERO,
            total_value: Decimal::ZERO,
            performance: PerformanceMetrics {
                twr: Decimal::ZERO,
                xirr: None,
                sharpe: None,
            },
            tax_summary: TaxSummary {
                account_type,
                years: Vec::new(),
            },
            warnings: Vec::new(),
        }
    }
}
