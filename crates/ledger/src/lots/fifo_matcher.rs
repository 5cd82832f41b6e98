use crate::constants::QUANTITY_THRESHOLD;
use crate::errors::{CalculatorError, Result};
use crate::fx::CurrencyConverter;
use crate::lots::{Lot, RealizedEvent};
use crate::transactions::{Transaction, TransactionType};

use log::{debug, warn};
use rust_decimal::Decimal;

/// Result of replaying one (account, instrument) transaction stream.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    /// All lots ever opened, in acquisition order. Consumed lots are kept
    /// with `quantity_remaining == 0` for audit.
    pub lots: Vec<Lot>,
    pub realized: Vec<RealizedEvent>,
}

impl MatchOutcome {
    pub fn open_lots(&self) -> impl Iterator<Item = &Lot> {
        self.lots.iter().filter(|lot| lot.is_open())
    }
}

/// FIFO lot matcher for a single (account, instrument) pair.
///
/// Replays transactions in trade-date order (ties broken by transaction id),
/// opening lots on acquisitions and realizing P&L on disposals against the
/// oldest remaining lots. All monetary outputs are in the base currency,
/// converted at each transaction's trade date. Deterministic: no clocks,
/// no randomness.
pub struct FifoMatcher<'a> {
    converter: &'a CurrencyConverter,
    base_currency: &'a str,
}

impl<'a> FifoMatcher<'a> {
    pub fn new(converter: &'a CurrencyConverter, base_currency: &'a str) -> Self {
        FifoMatcher {
            converter,
            base_currency,
        }
    }

    /// Replays `transactions`, which must all belong to one (account,
    /// instrument) pair. Input order does not matter; the matcher sorts by
    /// the deterministic (trade_date, id) key itself.
    pub fn match_transactions(&self, transactions: &[Transaction]) -> Result<MatchOutcome> {
        let mut ordered: Vec<&Transaction> = transactions.iter().collect();
        ordered.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        let mut lots: Vec<Lot> = Vec::new();
        let mut realized: Vec<RealizedEvent> = Vec::new();
        // Running split-adjusted expectation for the conservation check.
        let mut expected_open_quantity = Decimal::ZERO;

        for tx in &ordered {
            match tx.kind {
                TransactionType::Buy | TransactionType::Deposit => {
                    if tx.instrument_id.is_none() {
                        // Cash movement, no lot effect. The orchestrator
                        // books it as an external flow.
                        continue;
                    }
                    self.open_lot(tx, &mut lots)?;
                    expected_open_quantity += tx.abs_quantity();
                }
                TransactionType::Sell | TransactionType::Withdrawal => {
                    if tx.instrument_id.is_none() {
                        continue;
                    }
                    self.close_lots(tx, &mut lots, &mut realized)?;
                    expected_open_quantity -= tx.abs_quantity();
                }
                TransactionType::Split | TransactionType::SpinOff | TransactionType::Merger => {
                    let ratio = Self::rescale_ratio(tx)?;
                    for lot in lots.iter_mut().filter(|lot| lot.is_open()) {
                        lot.quantity_remaining *= ratio;
                        lot.unit_cost /= ratio;
                    }
                    expected_open_quantity *= ratio;
                    debug!(
                        "Applied {} ratio {} to open lots of {} in account {}",
                        tx.kind, ratio, tx.instrument_id.as_deref().unwrap_or(""), tx.account_id
                    );
                }
                TransactionType::Dividend
                | TransactionType::Coupon
                | TransactionType::Tax
                | TransactionType::Fee => {
                    // Cash effects only; handled by the income/tax stages.
                }
            }
        }

        self.verify_conservation(&lots, expected_open_quantity, ordered.last())?;

        Ok(MatchOutcome { lots, realized })
    }

    fn open_lot(&self, tx: &Transaction, lots: &mut Vec<Lot>) -> Result<()> {
        let quantity = tx.abs_quantity();
        if quantity < QUANTITY_THRESHOLD {
            return Err(CalculatorError::InvalidTransaction(format!(
                "Acquisition {} has non-positive quantity {}",
                tx.id, tx.quantity
            ))
            .into());
        }

        let gross_base = self.to_base(tx.gross_amount(), tx)?;
        let fee_base = self.to_base(tx.fee, tx)?;
        let unit_cost = (gross_base + fee_base) / quantity;

        lots.push(Lot {
            instrument_id: tx.instrument_id.clone().unwrap_or_default(),
            account_id: tx.account_id.clone(),
            open_date: tx.trade_date,
            quantity_remaining: quantity,
            unit_cost,
            source_transaction_id: tx.id.clone(),
        });
        Ok(())
    }

    fn close_lots(
        &self,
        tx: &Transaction,
        lots: &mut [Lot],
        realized: &mut Vec<RealizedEvent>,
    ) -> Result<()> {
        let quantity = tx.abs_quantity();
        if quantity < QUANTITY_THRESHOLD {
            return Err(CalculatorError::InvalidTransaction(format!(
                "Disposal {} has non-positive quantity {}",
                tx.id, tx.quantity
            ))
            .into());
        }

        let available: Decimal = lots
            .iter()
            .filter(|lot| lot.is_open())
            .map(|lot| lot.quantity_remaining)
            .sum();
        if quantity > available + QUANTITY_THRESHOLD {
            let instrument_id = tx.instrument_id.clone().unwrap_or_default();
            warn!(
                "Oversell of {} in account {} on {}: requested {}, held {}",
                instrument_id, tx.account_id, tx.trade_date, quantity, available
            );
            return Err(CalculatorError::InsufficientLots {
                account_id: tx.account_id.clone(),
                instrument_id,
                date: tx.trade_date,
                shortfall: quantity - available,
            }
            .into());
        }

        let gross_base = self.to_base(tx.gross_amount(), tx)?;
        let fee_base = self.to_base(tx.fee, tx)?;
        let proceeds = gross_base - fee_base;

        let mut to_consume = quantity;
        let mut cost_basis = Decimal::ZERO;
        // The youngest consumed lot determines the holding period: the
        // minimum holding never overstates long-term relief eligibility.
        let mut youngest_open_date = None;

        for lot in lots.iter_mut() {
            if to_consume < QUANTITY_THRESHOLD {
                break;
            }
            if !lot.is_open() {
                continue;
            }

            let take = lot.quantity_remaining.min(to_consume);
            cost_basis += lot.unit_cost * take;
            lot.quantity_remaining -= take;
            to_consume -= take;
            youngest_open_date = Some(match youngest_open_date {
                Some(prev) if prev > lot.open_date => prev,
                _ => lot.open_date,
            });

            if lot.quantity_remaining.is_sign_negative() {
                return Err(CalculatorError::InvariantViolation {
                    account_id: tx.account_id.clone(),
                    instrument_id: lot.instrument_id.clone(),
                    detail: format!(
                        "Lot {} went negative ({}) consuming disposal {}",
                        lot.source_transaction_id, lot.quantity_remaining, tx.id
                    ),
                }
                .into());
            }
        }

        let open_date = youngest_open_date.unwrap_or(tx.trade_date);
        realized.push(RealizedEvent {
            instrument_id: tx.instrument_id.clone().unwrap_or_default(),
            account_id: tx.account_id.clone(),
            close_date: tx.trade_date,
            quantity,
            proceeds,
            cost_basis,
            realized_pnl: proceeds - cost_basis,
            holding_period_days: (tx.trade_date - open_date).num_days(),
        });
        Ok(())
    }

    fn rescale_ratio(tx: &Transaction) -> Result<Decimal> {
        let ratio = tx.quantity;
        if !ratio.is_sign_positive() || ratio.is_zero() {
            return Err(CalculatorError::InvalidTransaction(format!(
                "Corporate action {} has non-positive ratio {}",
                tx.id, ratio
            ))
            .into());
        }
        Ok(ratio)
    }

    fn to_base(&self, amount: Decimal, tx: &Transaction) -> Result<Decimal> {
        Ok(self
            .converter
            .convert_amount(amount, &tx.currency, self.base_currency, tx.trade_date)?)
    }

    /// Split-adjusted conservation check: open quantity must equal the
    /// replayed signed quantities. A mismatch is an internal logic bug and
    /// is fatal, never clamped.
    fn verify_conservation(
        &self,
        lots: &[Lot],
        expected_open_quantity: Decimal,
        last_tx: Option<&&Transaction>,
    ) -> Result<()> {
        let open_quantity: Decimal = lots
            .iter()
            .filter(|lot| lot.is_open())
            .map(|lot| lot.quantity_remaining)
            .sum();

        if (open_quantity - expected_open_quantity).abs() > QUANTITY_THRESHOLD {
            let (account_id, instrument_id) = last_tx
                .map(|tx| {
                    (
                        tx.account_id.clone(),
                        tx.instrument_id.clone().unwrap_or_default(),
                    )
                })
                .unwrap_or_default();
            return Err(CalculatorError::InvariantViolation {
                account_id,
                instrument_id,
                detail: format!(
                    "Open lot quantity {} != replayed transaction quantity {}",
                    open_quantity, expected_open_quantity
                ),
            }
            .into());
        }
        Ok(())
    }
}
