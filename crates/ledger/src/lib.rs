//! Kapital Ledger - Portfolio ledger and analytics engine.
//!
//! This crate contains the pure computation core: FIFO lot accounting,
//! currency conversion, valuation, performance metrics and Russian tax
//! figures. It is storage-agnostic and defines the repository trait the
//! persistence layer implements; everything here is deterministic over
//! its inputs.

pub mod constants;
pub mod errors;
pub mod fx;
pub mod lots;
pub mod market_data;
pub mod performance;
pub mod snapshot;
pub mod taxes;
pub mod transactions;
pub mod utils;
pub mod valuation;

// Re-export the orchestrator and its output model
pub use snapshot::{AnalyticsSnapshot, LedgerOrchestrator, SnapshotWarning};

// Re-export error types
pub use errors::Error;
pub use errors::Result;
