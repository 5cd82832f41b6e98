//! Snapshot module - the ledger orchestrator, its immutable output model,
//! caching and per-portfolio run locks.

mod snapshot_model;
pub mod snapshot_service;

pub use snapshot_model::{AnalyticsSnapshot, SnapshotWarning};
pub use snapshot_service::LedgerOrchestrator;
