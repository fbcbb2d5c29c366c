//! Monetary amount validation.
//!
//! Amounts are [`Decimal`] values stored as `NUMERIC(14, 2)`; anything with
//! more precision or outside the column range is rejected before it reaches
//! the database.

use rust_decimal::Decimal;

use crate::error::CoreError;

/// Number of decimal places kept for every stored amount.
pub const AMOUNT_SCALE: u32 = 2;

/// Largest amount a `NUMERIC(14, 2)` column can hold.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0x107A_3FFF, 0x5AF3, 0, false, AMOUNT_SCALE);

/// Validate that `value` is a strictly positive amount with at most two
/// decimal places and within the storable range.
pub fn validate_positive_amount(value: Decimal, field: &str) -> Result<(), CoreError> {
    if value <= Decimal::ZERO {
        return Err(CoreError::Validation(format!(
            "{field} must be greater than zero, got {value}"
        )));
    }
    if value.normalize().scale() > AMOUNT_SCALE {
        return Err(CoreError::Validation(format!(
            "{field} must have at most {AMOUNT_SCALE} decimal places, got {value}"
        )));
    }
    if value > MAX_AMOUNT {
        return Err(CoreError::Validation(format!(
            "{field} exceeds the maximum of {MAX_AMOUNT}"
        )));
    }
    Ok(())
}
