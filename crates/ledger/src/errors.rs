//! Error types for the ledger engine.
//!
//! Calculation stages raise typed errors; the orchestrator never
//! catches-and-continues for data errors. Only stale-price warnings and
//! XIRR non-convergence are carried alongside an otherwise valid snapshot.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the ledger engine.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Ledger calculation failed: {0}")]
    Calculation(#[from] CalculatorError),

    #[error("Fx error: {0}")]
    Fx(#[from] FxError),

    #[error("Performance calculation failed: {0}")]
    Performance(#[from] PerformanceError),

    #[error("Tax calculation failed: {0}")]
    Tax(#[from] TaxError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Ledger run cancelled")]
    Cancelled,
}

/// Errors raised by the FIFO lot matcher and related lot bookkeeping.
///
/// `InsufficientLots` and invariant violations fail the whole ledger run for
/// the affected portfolio; no partial state is exposed.
#[derive(Error, Debug)]
pub enum CalculatorError {
    #[error(
        "Insufficient lots for instrument {instrument_id} in account {account_id} on {date}: \
         short {shortfall} units"
    )]
    InsufficientLots {
        account_id: String,
        instrument_id: String,
        date: NaiveDate,
        shortfall: Decimal,
    },

    #[error("Invalid transaction data: {0}")]
    InvalidTransaction(String),

    /// Lot/realized-event reconciliation failed or a lot went negative.
    /// Indicates an upstream logic bug, never clamped.
    #[error("Ledger invariant violated for {instrument_id} in account {account_id}: {detail}")]
    InvariantViolation {
        account_id: String,
        instrument_id: String,
        detail: String,
    },
}

/// FX conversion errors.
#[derive(Error, Debug)]
pub enum FxError {
    /// No rate exists on or before the requested date. Never defaulted to 1.0.
    #[error("No FX rate for {from}->{to} on or before {date}")]
    MissingRate {
        from: String,
        to: String,
        date: NaiveDate,
    },
}

/// Numerical errors from the performance calculator.
#[derive(Error, Debug)]
pub enum PerformanceError {
    /// Neither Newton-Raphson nor the bisection fallback converged.
    /// Reported explicitly; TWR and positions do not depend on it.
    #[error("XIRR did not converge after {iterations} iterations (last estimate {last_estimate})")]
    XirrDidNotConverge { iterations: u32, last_estimate: f64 },

    #[error("Not enough valuation points to compute returns ({0} provided)")]
    InsufficientHistory(usize),
}

/// Errors from the tax calculator.
#[derive(Error, Debug)]
pub enum TaxError {
    #[error("Invalid tax rules: {0}")]
    InvalidRules(String),
}

/// Validation errors for engine inputs.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to parse decimal number: {0}")]
    DecimalParse(#[from] rust_decimal::Error),

    #[error("Failed to parse date: {0}")]
    DateParse(#[from] chrono::ParseError),
}

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::Validation(ValidationError::DecimalParse(err))
    }
}

impl From<chrono::ParseError> for Error {
    fn from(err: chrono::ParseError) -> Self {
        Error::Validation(ValidationError::DateParse(err))
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}
