//! Fixed-point scales and checked integer arithmetic.
//!
//! Ledger state holds integers only. Money is in micro-units, FX rates are
//! scaled by [`SCALE`], health factors by [`PRECISION`]. Every division
//! truncates toward zero.

use crate::core::error::{LedgerError, Result};
use rust_decimal::Decimal;

/// Scale of micro-unit amounts and FX rates.
pub const SCALE: u128 = 1_000_000;

/// Scale of health factors ("ratio × 10^18").
pub const PRECISION: u128 = 1_000_000_000_000_000_000;

/// Basis-point denominator.
pub const BPS: u128 = 10_000;

pub const SECONDS_PER_DAY: i64 = 86_400;

/// Checked product of several factors.
pub fn checked_product(factors: &[u128], context: &'static str) -> Result<u128> {
    factors.iter().try_fold(1u128, |acc, f| {
        acc.checked_mul(*f)
            .ok_or(LedgerError::ArithmeticOverflow(context))
    })
}

/// `a × b / denominator`, truncating.
pub fn mul_div(a: u128, b: u128, denominator: u128, context: &'static str) -> Result<u128> {
    if denominator == 0 {
        return Err(LedgerError::InvalidParams(format!(
            "zero denominator in {context}"
        )));
    }
    let product = a
        .checked_mul(b)
        .ok_or(LedgerError::ArithmeticOverflow(context))?;
    Ok(product / denominator)
}

/// Render a fixed-point integer as a Decimal with `scale` fractional digits.
///
/// Returns `None` when the value does not fit Decimal's 96-bit mantissa.
pub fn to_decimal(value: u128, scale: u32) -> Option<Decimal> {
    let signed = i128::try_from(value).ok()?;
    Decimal::try_from_i128_with_scale(signed, scale).ok()
}

/// Render micro-units as whole units.
pub fn micros_to_decimal(value: u128) -> Option<Decimal> {
    to_decimal(value, 6)
}
