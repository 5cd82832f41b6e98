//! Market data module - price snapshots supplied read-only by the caller.

mod market_data_model;
pub mod price_table;

pub use market_data_model::PriceSnapshot;
pub use price_table::PriceTable;
