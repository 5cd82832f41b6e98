//! FX module - historical exchange rates and conversion.

pub mod currency_converter;
mod fx_model;

pub use currency_converter::CurrencyConverter;
pub use fx_model::FxRate;

pub use crate::errors::FxError;
