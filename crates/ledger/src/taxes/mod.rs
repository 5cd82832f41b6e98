//! Russian tax module - NDFL on realized gains and income, IIS account
//! regimes and long-term ownership (LDV) relief.

pub mod tax_calculator;
mod tax_model;

pub use tax_calculator::TaxCalculator;
pub use tax_model::{
    AccountType, IncomeEvent, IncomeKind, TaxRules, TaxSummary, TaxYearSummary,
};
