//! Monetary amounts.
//!
//! Amounts are plain [`Decimal`] values in the store currency's standard unit
//! (dollars, not cents). This module holds the rounding rule and the
//! validation every incoming amount goes through.

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of decimal places kept for monetary values.
pub const CURRENCY_SCALE: u32 = 2;

/// Largest amount a money column (`NUMERIC(12, 2)`) can hold: 9,999,999,999.99.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, CURRENCY_SCALE);

/// Errors for amounts supplied by clients or configuration.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The amount is below zero.
    #[error("amount cannot be negative")]
    Negative,
    /// The amount has sub-cent precision.
    #[error("amount cannot have more than {CURRENCY_SCALE} decimal places")]
    TooPrecise,
    /// The amount does not fit a money column.
    #[error("amount cannot exceed {MAX_AMOUNT}")]
    TooLarge,
    /// The string is not a decimal number.
    #[error("invalid amount: {0}")]
    Invalid(String),
}

/// Round an amount to whole cents, half away from zero.
///
/// ```
/// use rust_decimal::Decimal;
/// use storekeep_core::round_cents;
///
/// assert_eq!(round_cents(Decimal::new(12345, 3)), Decimal::new(1235, 2));
/// assert_eq!(round_cents(Decimal::new(-12345, 3)), Decimal::new(-1235, 2));
/// ```
#[must_use]
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Check that an amount is a non-negative whole number of cents no larger
/// than [`MAX_AMOUNT`].
///
/// # Errors
///
/// Returns [`MoneyError::Negative`], [`MoneyError::TooPrecise`] or
/// [`MoneyError::TooLarge`].
pub fn validate_amount(amount: Decimal) -> Result<Decimal, MoneyError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(MoneyError::Negative);
    }
    if amount.normalize().scale() > CURRENCY_SCALE {
        return Err(MoneyError::TooPrecise);
    }
    if amount > MAX_AMOUNT {
        return Err(MoneyError::TooLarge);
    }
    Ok(amount)
}

/// Parse and validate an amount from text (configuration values, CLI flags).
///
/// # Errors
///
/// Returns [`MoneyError::Invalid`] if the text is not a number, otherwise the
/// errors of [`validate_amount`].
pub fn parse_amount(s: &str) -> Result<Decimal, MoneyError> {
    let amount = s
        .trim()
        .parse::<Decimal>()
        .map_err(|e| MoneyError::Invalid(e.to_string()))?;
    validate_amount(amount)
}
