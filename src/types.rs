//! Core types and constants

use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

/// Timestamp type used throughout the library
pub type Timestamp = DateTime<Utc>;

/// Identifier of a user in the external identity store
pub type UserId = i64;

/// Auto-assigned identifier of a transaction record
pub type TransactionId = i64;

/// Monetary amount (exact decimal)
pub type Amount = Decimal;

/// Exchange rate: units of "to" per unit of "from"
pub type Rate = Decimal;

/// Default number of decimal places kept on stored balances
pub const DEFAULT_BALANCE_SCALE: u32 = 2;

/// Reject non-positive amounts and amounts finer than the balance scale.
///
/// Amounts are never rounded or clamped on the way in.
pub fn validate_amount(amount: Amount, scale: u32) -> Result<Amount> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(format!(
            "amount must be greater than zero, got {}",
            amount
        )));
    }
    if amount.normalize().scale() > scale {
        return Err(LedgerError::InvalidAmount(format!(
            "amount {} has more than {} decimal places",
            amount, scale
        )));
    }
    Ok(amount)
}

/// Round a monetary value to `scale` places (half away from zero)
pub fn round_money(value: Decimal, scale: u32) -> Decimal {
    value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validate_positive() {
        assert_eq!(validate_amount(dec!(10.50), 2).unwrap(), dec!(10.50));
        assert!(validate_amount(dec!(0), 2).is_err());
        assert!(validate_amount(dec!(-1), 2).is_err());
    }

    #[test]
    fn test_validate_scale() {
        // Trailing zeros don't count against the scale
        assert!(validate_amount(dec!(1.5000), 2).is_ok());
        let err = validate_amount(dec!(1.005), 2).unwrap_err();
        assert_eq!(err.kind(), "invalid_amount");
    }

    #[test]
    fn test_round_money() {
        assert_eq!(round_money(dec!(34.005), 2), dec!(34.01));
        assert_eq!(round_money(dec!(33.994999), 2), dec!(33.99));
        assert_eq!(round_money(dec!(34), 2), dec!(34));
    }
}
