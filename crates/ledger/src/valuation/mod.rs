//! Valuation module - marking open lots to market.

pub mod valuation_calculator;
mod valuation_model;

pub use valuation_calculator::{calculate_positions, total_market_value};
pub use valuation_model::Position;
