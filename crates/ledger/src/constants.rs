use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Decimal precision for valuation and performance figures.
pub const DECIMAL_PRECISION: u32 = 6;

/// Quantity threshold below which a lot is considered fully consumed.
pub const QUANTITY_THRESHOLD: Decimal = dec!(0.00000001);

/// Day-count denominator for XIRR exponents.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// XIRR solver controls.
pub const XIRR_INITIAL_GUESS: f64 = 0.1;
pub const XIRR_TOLERANCE: f64 = 1e-7;
pub const XIRR_MAX_ITERATIONS: u32 = 100;
