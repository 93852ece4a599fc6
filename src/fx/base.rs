//! Base FX types - RateQuote and the RateSource trait

use crate::currency::CurrencyCode;
use crate::error::Result;
use crate::types::Rate;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One stored exchange rate row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateQuote {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    /// Units of `to` per unit of `from`
    pub rate: Rate,
    pub date: NaiveDate,
}

impl RateQuote {
    pub fn new(from: CurrencyCode, to: CurrencyCode, rate: Rate, date: NaiveDate) -> Self {
        Self {
            from,
            to,
            rate,
            date,
        }
    }

    /// Non-positive rates are stored but never used for conversion
    pub fn is_usable(&self) -> bool {
        self.rate > Decimal::ZERO
    }
}

/// Trait for reading stored exchange rates
///
/// Implementations return the most recent row for the ordered pair whose
/// date is on or before `as_of`. They never derive rates; fallback logic
/// lives in [`RateResolver`](super::RateResolver).
pub trait RateSource {
    fn most_recent_rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        as_of: NaiveDate,
    ) -> Result<Option<RateQuote>>;
}

impl<R: RateSource + ?Sized> RateSource for &R {
    fn most_recent_rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        as_of: NaiveDate,
    ) -> Result<Option<RateQuote>> {
        (**self).most_recent_rate(from, to, as_of)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_quote_usable() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let usd = CurrencyCode::new("USD").unwrap();
        let ils = CurrencyCode::new("ILS").unwrap();

        assert!(RateQuote::new(usd.clone(), ils.clone(), dec!(3.7), date).is_usable());
        assert!(!RateQuote::new(usd.clone(), ils.clone(), dec!(0), date).is_usable());
        assert!(!RateQuote::new(usd, ils, dec!(-1), date).is_usable());
    }
}
