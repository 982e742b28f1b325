//! Two-decimal monetary amounts
//!
//! Amounts are persisted as REAL; all arithmetic goes through `Decimal` and is
//! rounded to cents before being written back.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

use super::DomainError;

/// Largest amount accepted on input: ten digits, two of them decimals.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(999_999_999, 0, 0, false, 2);

pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert a stored/received amount, rejecting NaN and infinities.
pub fn to_decimal(value: f64) -> Result<Decimal, DomainError> {
    Decimal::from_f64(value)
        .map(round_cents)
        .ok_or_else(|| DomainError::invalid(format!("invalid amount {}", value)))
}

/// Rounded to cents; `cents / 100.0` yields the closest `f64` to the decimal value.
pub fn to_f64(value: Decimal) -> f64 {
    let rounded = round_cents(value);
    match rounded.checked_mul(Decimal::ONE_HUNDRED).and_then(|c| c.to_i64()) {
        Some(cents) => cents as f64 / 100.0,
        None => rounded.to_f64().unwrap_or(if rounded.is_sign_negative() {
            f64::MIN
        } else {
            f64::MAX
        }),
    }
}

/// Input amount in `0..=MAX_AMOUNT`, rounded to cents.
pub fn ensure_non_negative(value: f64, field: &str) -> Result<Decimal, DomainError> {
    let amount = to_decimal(value)?;
    if amount < Decimal::ZERO {
        return Err(DomainError::invalid(format!("{} must not be negative", field)));
    }
    if amount > MAX_AMOUNT {
        return Err(DomainError::invalid(format!(
            "{} must not exceed {}",
            field, MAX_AMOUNT
        )));
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_keeps_cents() {
        assert_eq!(to_f64(to_decimal(19.99).unwrap()), 19.99);
        assert_eq!(to_f64(Decimal::new(43333, 4)), 4.33);
    }

    #[test]
    fn negative_amounts_are_rejected() {
        assert!(ensure_non_negative(-0.01, "amount").is_err());
        assert!(ensure_non_negative(0.0, "amount").is_ok());
        assert!(to_decimal(f64::NAN).is_err());
    }

    #[test]
    fn amounts_above_ten_digits_are_rejected() {
        assert_eq!(to_f64(MAX_AMOUNT), 99_999_999.99);
        assert!(ensure_non_negative(99_999_999.99, "amount").is_ok());
        assert!(matches!(
            ensure_non_negative(100_000_000.0, "amount"),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            ensure_non_negative(1.0e17, "amount"),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn large_values_never_collapse_to_zero() {
        let big = Decimal::from(100_000_000_000_000_000i64);
        assert_eq!(to_f64(big), 1.0e17);
    }
}
