//! Rate resolution with fallback
//!
//! Turns an ordered currency pair into a usable rate. Strategies are tried
//! in a fixed order and the first success wins:
//!
//! 1. identity (`from == to`, rate 1, no lookup)
//! 2. direct: latest stored `from -> to`
//! 3. cross: `(from -> REF) / (to -> REF)` when neither side is the reference
//! 4. reciprocal: `1 / (to -> from)`
//!
//! Derived rates may disagree slightly with direct ones. That is accepted.

use super::base::{RateQuote, RateSource};
use crate::currency::CurrencyCode;
use crate::error::{LedgerError, Result};
use crate::types::Rate;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a rate was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Identity,
    Direct,
    Cross,
    Reciprocal,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resolution::Identity => "identity",
            Resolution::Direct => "direct",
            Resolution::Cross => "cross",
            Resolution::Reciprocal => "reciprocal",
        };
        f.write_str(name)
    }
}

/// A usable rate for an ordered pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRate {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub rate: Rate,
    pub resolution: Resolution,
    /// Date of the oldest stored row the rate was derived from
    pub date: Option<NaiveDate>,
}

impl ResolvedRate {
    /// Convert an amount at this rate, full precision
    pub fn apply(&self, amount: Decimal) -> Option<Decimal> {
        amount.checked_mul(self.rate)
    }
}

/// Resolves exchange rates against a [`RateSource`]
#[derive(Debug, Clone)]
pub struct RateResolver {
    reference: CurrencyCode,
}

impl RateResolver {
    /// Create a resolver anchored on `reference` (the home currency)
    pub fn new(reference: CurrencyCode) -> Self {
        Self { reference }
    }

    pub fn reference(&self) -> &CurrencyCode {
        &self.reference
    }

    /// Resolve the rate for `from -> to` as of `as_of`
    pub fn resolve<R: RateSource + ?Sized>(
        &self,
        source: &R,
        from: &CurrencyCode,
        to: &CurrencyCode,
        as_of: NaiveDate,
    ) -> Result<ResolvedRate> {
        if from == to {
            return Ok(ResolvedRate {
                from: from.clone(),
                to: to.clone(),
                rate: Decimal::ONE,
                resolution: Resolution::Identity,
                date: None,
            });
        }

        if let Some(quote) = usable(source.most_recent_rate(from, to, as_of)?) {
            return Ok(self.finish(from, to, quote.rate, Resolution::Direct, Some(quote.date)));
        }

        if from != &self.reference && to != &self.reference {
            let from_ref = usable(source.most_recent_rate(from, &self.reference, as_of)?);
            let to_ref = usable(source.most_recent_rate(to, &self.reference, as_of)?);
            if let (Some(from_ref), Some(to_ref)) = (from_ref, to_ref) {
                if let Some(rate) = from_ref.rate.checked_div(to_ref.rate) {
                    let date = from_ref.date.min(to_ref.date);
                    return Ok(self.finish(from, to, rate, Resolution::Cross, Some(date)));
                }
            }
        }

        if let Some(reverse) = usable(source.most_recent_rate(to, from, as_of)?) {
            if let Some(rate) = Decimal::ONE.checked_div(reverse.rate) {
                return Ok(self.finish(from, to, rate, Resolution::Reciprocal, Some(reverse.date)));
            }
        }

        log::debug!("No usable rate for {}/{} as of {}", from, to, as_of);
        Err(LedgerError::RateNotFound {
            from: from.to_string(),
            to: to.to_string(),
        })
    }

    fn finish(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        rate: Rate,
        resolution: Resolution,
        date: Option<NaiveDate>,
    ) -> ResolvedRate {
        log::debug!("Resolved {}/{} = {} ({})", from, to, rate, resolution);
        ResolvedRate {
            from: from.clone(),
            to: to.clone(),
            rate,
            resolution,
            date,
        }
    }
}

fn usable(quote: Option<RateQuote>) -> Option<RateQuote> {
    quote.filter(RateQuote::is_usable)
}
