use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of transaction kinds the ledger understands.
///
/// The lot matcher matches on this exhaustively, so adding a kind is a
/// compile-time-checked change.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Buy,
    Sell,
    Dividend,
    Coupon,
    Tax,
    Fee,
    Deposit,
    Withdrawal,
    Split,
    SpinOff,
    Merger,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Buy => "BUY",
            TransactionType::Sell => "SELL",
            TransactionType::Dividend => "DIVIDEND",
            TransactionType::Coupon => "COUPON",
            TransactionType::Tax => "TAX",
            TransactionType::Fee => "FEE",
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Withdrawal => "WITHDRAWAL",
            TransactionType::Split => "SPLIT",
            TransactionType::SpinOff => "SPIN_OFF",
            TransactionType::Merger => "MERGER",
        }
    }

    /// Corporate actions rescale open lots without realizing P&L.
    pub fn is_corporate_action(&self) -> bool {
        matches!(
            self,
            TransactionType::Split | TransactionType::SpinOff | TransactionType::Merger
        )
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BUY" => Ok(TransactionType::Buy),
            "SELL" => Ok(TransactionType::Sell),
            "DIVIDEND" => Ok(TransactionType::Dividend),
            "COUPON" => Ok(TransactionType::Coupon),
            "TAX" => Ok(TransactionType::Tax),
            "FEE" => Ok(TransactionType::Fee),
            "DEPOSIT" => Ok(TransactionType::Deposit),
            "WITHDRAWAL" => Ok(TransactionType::Withdrawal),
            "SPLIT" => Ok(TransactionType::Split),
            "SPIN_OFF" => Ok(TransactionType::SpinOff),
            "MERGER" => Ok(TransactionType::Merger),
            other => Err(format!("Unknown transaction type: {}", other)),
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A normalized transaction, as produced by the import pipeline.
///
/// Immutable once created; the transaction log is append-only and is the
/// source of truth the engine replays.
///
/// Conventions:
/// - `quantity` is signed: positive for BUY/DEPOSIT, negative for
///   SELL/WITHDRAWAL.
/// - For cash movements `instrument_id` is `None` and `quantity` carries the
///   signed cash amount with `price == 1`.
/// - For SPLIT/SPIN_OFF/MERGER `quantity` carries the rescale ratio
///   (e.g. `2` for a 2:1 split).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub account_id: String,
    pub instrument_id: Option<String>,
    pub kind: TransactionType,
    pub quantity: Decimal,
    /// Unit price in the instrument's currency.
    pub price: Decimal,
    pub currency: String,
    pub trade_date: NaiveDate,
    pub settlement_date: NaiveDate,
    pub fee: Decimal,
    pub external_ref: Option<String>,
}

impl Transaction {
    /// Unsigned quantity, for lot arithmetic.
    pub fn abs_quantity(&self) -> Decimal {
        self.quantity.abs()
    }

    /// Gross amount in the transaction currency (quantity * price), unsigned.
    pub fn gross_amount(&self) -> Decimal {
        (self.quantity * self.price).abs()
    }

    /// Ordering key: trade date ascending, ties broken by id (insertion
    /// order) so replays are deterministic.
    pub fn sort_key(&self) -> (NaiveDate, &str) {
        (self.trade_date, self.id.as_str())
    }

    /// True for deposits and withdrawals, cash or in-kind. Both move value
    /// across the portfolio boundary, so both split TWR sub-periods and
    /// enter the money-weighted return as external flows.
    pub fn is_external_flow(&self) -> bool {
        matches!(
            self.kind,
            TransactionType::Deposit | TransactionType::Withdrawal
        )
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowDirection {
    In,
    Out,
}

/// An external cash flow in base currency, derived from deposit/withdrawal
/// transactions. Feeds the TWR sub-period split and XIRR.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CashFlow {
    pub portfolio_id: String,
    pub date: NaiveDate,
    /// Always positive; `direction` carries the sign.
    pub amount: Decimal,
    pub direction: FlowDirection,
}

impl CashFlow {
    /// Signed amount from the portfolio's perspective: inflows positive.
    pub fn signed_amount(&self) -> Decimal {
        match self.direction {
            FlowDirection::In => self.amount,
            FlowDirection::Out => -self.amount,
        }
    }
}
