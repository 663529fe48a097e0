//! Fixed-point helpers for stakes and coefficients.
//!
//! Every monetary value is a `Decimal` carried at exactly two fractional
//! digits, matching the `NUMERIC(10, 2)` columns the service has always used.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Number of fractional digits kept for amounts and coefficients.
pub const SCALE: u32 = 2;

/// Largest value representable as `NUMERIC(10, 2)`.
pub const MAX_AMOUNT: Decimal = dec!(99999999.99);

/// Rescale to exactly two fractional digits (banker's rounding past that).
pub fn fixed(value: Decimal) -> Decimal {
    let mut value = value.round_dp(SCALE);
    value.rescale(SCALE);
    value
}

/// A stake is valid when it is positive, fits `NUMERIC(10, 2)` and carries no
/// significant digits past the second decimal place.
pub fn is_valid_amount(amount: Decimal) -> bool {
    amount > Decimal::ZERO && amount <= MAX_AMOUNT && amount.normalize().scale() <= SCALE
}
