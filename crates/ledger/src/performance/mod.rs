//! Performance module - TWR, XIRR and Sharpe over a valuation history.

pub mod performance_calculator;
mod performance_model;

pub use performance_calculator::{calculate_sharpe, calculate_twr, calculate_xirr};
pub use performance_model::{PerformanceMetrics, PerformanceSettings, TwrResult, ValuationPoint};

#[cfg(test)]
mod performance_calculator_tests;
