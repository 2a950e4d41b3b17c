//! Monetary helpers.
//!
//! Amounts are `rust_decimal::Decimal` and stored with two fractional digits.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{DomainError, DomainResult};

/// Fractional digits kept for stored monetary values.
pub const MONEY_SCALE: u32 = 2;

/// Largest amount a NUMERIC(12,2) column holds: 9_999_999_999.99.
pub const MAX_MONEY: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// Round a derived amount to the stored precision (half away from zero).
///
/// The result always carries exactly two fractional digits, so `45` renders
/// as `45.00`.
pub fn round_money(amount: Decimal) -> Decimal {
    let mut rounded =
        amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// Reject negative amounts; `field` names the offending input.
pub fn ensure_non_negative(field: &str, amount: Decimal) -> DomainResult<()> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(DomainError::validation(format!("{field} must not be negative")));
    }
    Ok(())
}

/// Reject amounts that are negative or do not fit a money column.
pub fn ensure_money(field: &str, amount: Decimal) -> DomainResult<()> {
    ensure_non_negative(field, amount)?;
    if amount > MAX_MONEY {
        return Err(DomainError::validation(format!("{field} must not exceed {MAX_MONEY}")));
    }
    Ok(())
}

/// `lhs * rhs`; overflow is reported as a validation error on `field`.
pub fn checked_mul(field: &str, lhs: Decimal, rhs: Decimal) -> DomainResult<Decimal> {
    lhs.checked_mul(rhs)
        .ok_or_else(|| DomainError::validation(format!("{field} is out of range")))
}

/// Rounded sum of `amounts`, bounded by [`MAX_MONEY`].
pub fn checked_sum(
    field: &str,
    amounts: impl IntoIterator<Item = DomainResult<Decimal>>,
) -> DomainResult<Decimal> {
    let mut total = Decimal::ZERO;
    for amount in amounts {
        total = total
            .checked_add(amount?)
            .ok_or_else(|| DomainError::validation(format!("{field} is out of range")))?;
    }
    let total = round_money(total);
    ensure_money(field, total)?;
    Ok(total)
}
