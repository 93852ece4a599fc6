//! # fx-ledger
//!
//! A custodial multi-currency wallet ledger.
//!
//! Users hold one balance per currency. The ledger deposits, withdraws,
//! converts between a user's own wallets and transfers to other users,
//! writing an append-only transaction record for every balance it touches.
//! Exchange rates come from a SQLite rate table fed by an external rate
//! feed; missing pairs are derived through a reference currency or from the
//! reverse rate.
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use fx_ledger::prelude::*;
//! use rust_decimal::Decimal;
//!
//! # fn main() -> fx_ledger::error::Result<()> {
//! let usd = CurrencyCode::new("USD")?;
//! let eur = CurrencyCode::new("EUR")?;
//!
//! let store = Store::new_in_memory()?;
//! let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
//! store.rates().upsert(&usd, &eur, day, Decimal::new(85, 2))?;
//!
//! let mut ledger = Ledger::new(store, CurrencyCode::new("ILS")?);
//! ledger.deposit(1, &usd, Decimal::from(100))?;
//! let outcome = ledger.convert(1, &usd, &eur, Decimal::from(40))?;
//! assert_eq!(outcome.to_balance, Decimal::new(3400, 2));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod currency;
pub mod error;
pub mod fx;
pub mod ledger;
pub mod store;
pub mod types;

pub mod prelude {
    //! Commonly used types and traits
    pub use crate::config::{LedgerConfig, RefreshPolicy};
    pub use crate::currency::{CurrencyCode, CurrencyPair};
    pub use crate::error::{LedgerError, Result};
    pub use crate::fx::{RateFeed, RateIngestor, RateQuote, RateResolver, RateSource, Resolution, ResolvedRate};
    pub use crate::ledger::{ConversionOutcome, Ledger, TransactionRecord, TransactionType, TransferOutcome};
    pub use crate::store::{Store, UserDirectory, WalletBalance};
    pub use crate::types::*;
}
