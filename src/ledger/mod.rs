//! Wallet ledger - balance mutations with an audit trail
//!
//! [`Ledger`] wraps a [`Store`] and a [`RateResolver`]. Each operation
//! (deposit, withdraw, convert, transfer) runs in a single immediate SQLite
//! transaction covering the balance checks, the wallet updates and the
//! transaction records, so a failure leaves nothing behind.

pub mod operations;
pub mod queries;
pub mod transaction;

pub use operations::{ConversionOutcome, TransferOutcome};
pub use transaction::{NewTransaction, TransactionRecord, TransactionStatus, TransactionType};

use crate::config::LedgerConfig;
use crate::currency::CurrencyCode;
use crate::error::{LedgerError, Result};
use crate::fx::{RateFeed, RateIngestor, RateResolver};
use crate::store::Store;
use crate::types::DEFAULT_BALANCE_SCALE;
use chrono::{NaiveDate, Utc};

/// Feed pulled synchronously before each conversion
struct ConvertRefresh {
    feed: Box<dyn RateFeed>,
    ingestor: RateIngestor,
}

/// Multi-currency wallet ledger
pub struct Ledger {
    store: Store,
    resolver: RateResolver,
    balance_scale: u32,
    refresh: Option<ConvertRefresh>,
}

impl Ledger {
    /// Create a ledger over `store`, deriving cross rates through `reference`
    pub fn new(store: Store, reference: CurrencyCode) -> Self {
        Self {
            store,
            resolver: RateResolver::new(reference),
            balance_scale: DEFAULT_BALANCE_SCALE,
            refresh: None,
        }
    }

    /// Open the configured database.
    ///
    /// A `before_convert` refresh policy still needs a feed from
    /// [`with_feed`](Self::with_feed); the ledger does not pick one itself.
    pub fn from_config(config: &LedgerConfig) -> Result<Self> {
        config.validate()?;
        let store = Store::open_with_config(config)?;
        Ok(Self::new(store, config.reference()?).with_balance_scale(config.balance_scale))
    }

    /// Decimal places kept on balances
    pub fn with_balance_scale(mut self, scale: u32) -> Self {
        self.balance_scale = scale;
        self
    }

    /// Refresh the rate table from `feed` before every conversion
    pub fn with_feed(mut self, feed: Box<dyn RateFeed>, ingestor: RateIngestor) -> Self {
        self.refresh = Some(ConvertRefresh { feed, ingestor });
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    pub fn resolver(&self) -> &RateResolver {
        &self.resolver
    }

    pub fn balance_scale(&self) -> u32 {
        self.balance_scale
    }

    /// Pull the installed feed now; returns rows written
    pub fn refresh_rates(&mut self) -> Result<usize> {
        match &self.refresh {
            Some(refresh) => refresh.ingestor.refresh(&mut self.store, refresh.feed.as_ref()),
            None => Err(LedgerError::Config("no rate feed installed".to_string())),
        }
    }

    /// Best-effort refresh ahead of a conversion; a failure keeps the stored rates
    fn refresh_before_convert(&mut self) {
        if let Some(refresh) = &self.refresh {
            if let Err(e) = refresh.ingestor.refresh(&mut self.store, refresh.feed.as_ref()) {
                log::warn!(
                    "Rate refresh from {} failed, converting with stored rates: {}",
                    refresh.feed.name(),
                    e
                );
            }
        }
    }
}

/// Date rates are resolved as of
fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fx::{FeedSnapshot, PublishedRate, StaticRateFeed};
    use rust_decimal_macros::dec;

    fn code(s: &str) -> CurrencyCode {
        CurrencyCode::new(s).unwrap()
    }

    #[test]
    fn test_from_config_in_tempdir() {
        let dir = tempfile::tempdir().unwrap();
        let config = LedgerConfig {
            database_path: dir.path().join("ledger.db"),
            balance_scale: 4,
            ..LedgerConfig::default()
        };
        let ledger = Ledger::from_config(&config).unwrap();
        assert_eq!(ledger.balance_scale(), 4);
        assert_eq!(ledger.resolver().reference(), &code("ILS"));
        assert!(ledger.store().path().is_some());
    }

    #[test]
    fn test_refresh_rates_requires_feed() {
        let mut ledger = Ledger::new(Store::new_in_memory().unwrap(), code("ILS"));
        assert_eq!(ledger.refresh_rates().unwrap_err().kind(), "config_error");

        let feed = StaticRateFeed::new(FeedSnapshot {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            quotes: vec![PublishedRate::new(code("USD"), dec!(3.70), 1)],
        });
        let mut ledger = ledger.with_feed(Box::new(feed), RateIngestor::new(code("ILS")));
        assert_eq!(ledger.refresh_rates().unwrap(), 2);
    }
}
