//! Exploding rate source - testing stub
//!
//! Panics on any lookup. Used to prove that a code path never touches the
//! rate table, e.g. same-currency transfers.

use super::base::{RateQuote, RateSource};
use crate::currency::CurrencyCode;
use crate::error::Result;
use chrono::NaiveDate;

/// Rate source that panics when asked for a rate
///
/// # Example
/// ```should_panic
/// use fx_ledger::currency::CurrencyCode;
/// use fx_ledger::fx::{ExplodingRateSource, RateSource};
/// use chrono::NaiveDate;
///
/// let usd = CurrencyCode::new("USD").unwrap();
/// let eur = CurrencyCode::new("EUR").unwrap();
/// let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
///
/// // This will panic!
/// ExplodingRateSource::new().most_recent_rate(&usd, &eur, today).unwrap();
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ExplodingRateSource {
    message: Option<&'static str>,
}

impl ExplodingRateSource {
    pub fn new() -> Self {
        Self { message: None }
    }

    pub fn with_message(message: &'static str) -> Self {
        Self {
            message: Some(message),
        }
    }
}

impl RateSource for ExplodingRateSource {
    fn most_recent_rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        as_of: NaiveDate,
    ) -> Result<Option<RateQuote>> {
        panic!(
            "{}\n\nAttempted lookup: {} -> {} as of {}",
            self.message.unwrap_or("rate lookup not allowed here"),
            from,
            to,
            as_of
        );
    }
}
