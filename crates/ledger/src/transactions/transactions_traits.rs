use super::transactions_model::Transaction;
use crate::errors::Result;
use chrono::NaiveDate;

/// Contract the persistence layer implements to feed the engine.
///
/// Implementations return transactions for every account in the portfolio
/// with `trade_date <= up_to`, already normalized by the import pipeline.
/// Ordering is not required; the orchestrator sorts deterministically.
pub trait TransactionRepositoryTrait: Send + Sync {
    fn get_transactions(&self, portfolio_id: &str, up_to: NaiveDate) -> Result<Vec<Transaction>>;
}
