//! Transaction domain model and the persistence-layer contract.

mod transactions_model;
mod transactions_traits;

pub use transactions_model::{CashFlow, FlowDirection, Transaction, TransactionType};
pub use transactions_traits::TransactionRepositoryTrait;
