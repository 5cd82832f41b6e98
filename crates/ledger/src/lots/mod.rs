//! Lot accounting - open purchase lots and FIFO disposal matching.

pub mod fifo_matcher;
mod lots_model;

pub use fifo_matcher::{FifoMatcher, MatchOutcome};
pub use lots_model::{Lot, RealizedEvent};

#[cfg(test)]
mod fifo_matcher_tests;
