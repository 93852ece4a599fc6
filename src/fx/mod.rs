//! Foreign Exchange (FX) rate system
//!
//! # Components
//!
//! - **base**: `RateQuote` and the `RateSource` trait
//! - **resolver**: direct / cross / reciprocal rate resolution
//! - **in_memory**: in-memory rate storage
//! - **exploding**: testing stub that panics on lookup
//! - **feed**: rate feeds and ingestion into the rate table
//! - **http**, **refresher**: network feed and scheduled refresh (`async` feature)
//!
//! # Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use fx_ledger::currency::CurrencyCode;
//! use fx_ledger::fx::{InMemoryRateStore, RateResolver, Resolution};
//! use rust_decimal::Decimal;
//!
//! let ils = CurrencyCode::new("ILS").unwrap();
//! let usd = CurrencyCode::new("USD").unwrap();
//! let eur = CurrencyCode::new("EUR").unwrap();
//! let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
//!
//! let mut store = InMemoryRateStore::new();
//! store.add_rate(usd.clone(), ils.clone(), day, Decimal::new(370, 2)).unwrap();
//! store.add_rate(eur.clone(), ils.clone(), day, Decimal::new(400, 2)).unwrap();
//!
//! // No USD -> EUR row, so the rate is derived through ILS
//! let resolved = RateResolver::new(ils).resolve(&store, &usd, &eur, day).unwrap();
//! assert_eq!(resolved.resolution, Resolution::Cross);
//! assert_eq!(resolved.rate, Decimal::new(925, 3));
//! ```

pub mod base;
pub mod exploding;
pub mod feed;
pub mod in_memory;
pub mod resolver;

#[cfg(feature = "async")]
pub mod http;
#[cfg(feature = "async")]
pub mod refresher;

pub use base::{RateQuote, RateSource};
pub use exploding::ExplodingRateSource;
pub use feed::{parse_exchange_rates, FeedSnapshot, PublishedRate, RateFeed, RateIngestor, StaticRateFeed};
pub use in_memory::InMemoryRateStore;
pub use resolver::{RateResolver, Resolution, ResolvedRate};

#[cfg(feature = "async")]
pub use http::HttpRateFeed;
#[cfg(feature = "async")]
pub use refresher::{BackgroundRefresher, RefresherHandle, RefresherSettings};
