//! In-memory rate store
//!
//! Holds rates as `(from, to) -> (date -> rate)`. The BTreeMap gives the
//! "latest on or before" lookup directly. Useful for tests, previews and
//! benchmarks; the ledger itself reads rates from SQLite inside its
//! transaction.

use super::base::{RateQuote, RateSource};
use crate::currency::CurrencyCode;
use crate::error::{LedgerError, Result};
use crate::types::Rate;
use chrono::NaiveDate;
use hashbrown::HashMap;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// In-memory rate storage
#[derive(Debug, Clone, Default)]
pub struct InMemoryRateStore {
    rates: HashMap<(CurrencyCode, CurrencyCode), BTreeMap<NaiveDate, Rate>>,
}

impl InMemoryRateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the rate for a pair on a given date
    pub fn add_rate(
        &mut self,
        from: CurrencyCode,
        to: CurrencyCode,
        date: NaiveDate,
        rate: Rate,
    ) -> Result<()> {
        if rate <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(format!(
                "FX rate must be positive, got: {}",
                rate
            )));
        }

        self.rates.entry((from, to)).or_default().insert(date, rate);
        Ok(())
    }

    /// Add multiple rates; stops at the first invalid one
    pub fn add_rates(&mut self, quotes: impl IntoIterator<Item = RateQuote>) -> Result<()> {
        for quote in quotes {
            self.add_rate(quote.from, quote.to, quote.date, quote.rate)?;
        }
        Ok(())
    }

    /// Get total number of rate entries (across all pairs and dates)
    pub fn num_entries(&self) -> usize {
        self.rates.values().map(|tree| tree.len()).sum()
    }
}

impl RateSource for InMemoryRateStore {
    fn most_recent_rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        as_of: NaiveDate,
    ) -> Result<Option<RateQuote>> {
        let quote = self
            .rates
            .get(&(from.clone(), to.clone()))
            .and_then(|tree| tree.range(..=as_of).next_back())
            .map(|(date, rate)| RateQuote::new(from.clone(), to.clone(), *rate, *date));
        Ok(quote)
    }
}
