//! Rate feed and ingestion
//!
//! The central-bank feed publishes every currency against the reference
//! currency, sometimes per 100 or 1000 units. Ingestion normalizes those to
//! per-unit rates and upserts them into the rate table, in one transaction,
//! so readers never see half a refresh. Each quote is stored on the day the
//! bank last updated it, not on the day it was fetched.

use crate::config::LedgerConfig;
use crate::currency::CurrencyCode;
use crate::error::{LedgerError, Result};
use crate::store::{RateTable, Store};
use crate::types::Rate;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One published quote: `unit` units of `currency` are worth `rate` units
/// of the reference currency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedRate {
    pub currency: CurrencyCode,
    pub rate: Rate,
    pub unit: u32,
    /// Day the bank last updated this quote; the snapshot date when absent
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

impl PublishedRate {
    pub fn new(currency: CurrencyCode, rate: Rate, unit: u32) -> Self {
        Self {
            currency,
            rate,
            unit,
            date: None,
        }
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Rate for a single unit, `None` if the quote is unusable
    pub fn per_unit(&self) -> Option<Rate> {
        if self.unit == 0 || self.rate <= Decimal::ZERO {
            return None;
        }
        self.rate.checked_div(Decimal::from(self.unit))
    }
}

/// Everything a feed published for one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSnapshot {
    pub date: NaiveDate,
    pub quotes: Vec<PublishedRate>,
}

/// Trait for external rate feeds
pub trait RateFeed: Send + Sync {
    /// Fetch the latest published snapshot
    fn fetch(&self) -> Result<FeedSnapshot>;

    /// Get the feed name
    fn name(&self) -> &str;
}

/// Feed that always serves the same snapshot
#[derive(Debug, Clone)]
pub struct StaticRateFeed {
    snapshot: FeedSnapshot,
}

impl StaticRateFeed {
    pub fn new(snapshot: FeedSnapshot) -> Self {
        Self { snapshot }
    }
}

impl RateFeed for StaticRateFeed {
    fn fetch(&self) -> Result<FeedSnapshot> {
        Ok(self.snapshot.clone())
    }

    fn name(&self) -> &str {
        "static"
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeRatesDocument {
    exchange_rates: Vec<ExchangeRateEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeRateEntry {
    key: String,
    current_exchange_rate: serde_json::Number,
    #[serde(default = "default_unit")]
    unit: u32,
    #[serde(default)]
    last_update: Option<String>,
}

fn default_unit() -> u32 {
    1
}

/// Parse the central-bank JSON document (`exchangeRates[]` with `key`,
/// `currentExchangeRate`, `unit`, `lastUpdate`).
///
/// Entries with unknown codes or unparsable rates are skipped. Every quote
/// keeps its own `lastUpdate` day; the snapshot date is the latest of them,
/// or `fallback_date` when none is present.
pub fn parse_exchange_rates(body: &str, fallback_date: NaiveDate) -> Result<FeedSnapshot> {
    let document: ExchangeRatesDocument = serde_json::from_str(body)
        .map_err(|e| LedgerError::Feed(format!("Failed to parse rate document: {}", e)))?;

    let mut quotes = Vec::with_capacity(document.exchange_rates.len());
    let mut latest: Option<NaiveDate> = None;

    for entry in document.exchange_rates {
        let currency = match CurrencyCode::normalize(&entry.key) {
            Ok(code) => code,
            Err(_) => {
                log::warn!("Skipping feed entry with invalid currency {:?}", entry.key);
                continue;
            }
        };
        let text = entry.current_exchange_rate.to_string();
        let rate = match Decimal::from_str(&text).or_else(|_| Decimal::from_scientific(&text)) {
            Ok(rate) => rate,
            Err(_) => {
                log::warn!("Skipping {} with unparsable rate {}", currency, text);
                continue;
            }
        };
        let mut quote = PublishedRate::new(currency, rate, entry.unit);
        if let Some(day) = entry
            .last_update
            .as_deref()
            .and_then(|s| s.get(..10))
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        {
            latest = Some(latest.map_or(day, |d| d.max(day)));
            quote = quote.with_date(day);
        }
        quotes.push(quote);
    }

    Ok(FeedSnapshot {
        date: latest.unwrap_or(fallback_date),
        quotes,
    })
}

/// Writes feed snapshots into the rate table
#[derive(Debug, Clone)]
pub struct RateIngestor {
    reference: CurrencyCode,
    write_all_pairs: bool,
}

impl RateIngestor {
    pub fn new(reference: CurrencyCode) -> Self {
        Self {
            reference,
            write_all_pairs: false,
        }
    }

    pub fn from_config(config: &LedgerConfig) -> Result<Self> {
        Ok(Self::new(config.reference()?).with_all_pairs(config.feed.write_all_pairs))
    }

    /// Also write every X->Y cross pair, dated on the older of its two legs
    pub fn with_all_pairs(mut self, write_all_pairs: bool) -> Self {
        self.write_all_pairs = write_all_pairs;
        self
    }

    pub fn reference(&self) -> &CurrencyCode {
        &self.reference
    }

    /// Upsert a snapshot; returns the number of rows written
    pub fn ingest(&self, store: &mut Store, snapshot: &FeedSnapshot) -> Result<usize> {
        let normalized: Vec<(CurrencyCode, Rate, NaiveDate)> = snapshot
            .quotes
            .iter()
            .filter(|quote| quote.currency != self.reference)
            .filter_map(|quote| match quote.per_unit() {
                Some(rate) => Some((quote.currency.clone(), rate, quote.date.unwrap_or(snapshot.date))),
                None => {
                    log::warn!(
                        "Ignoring unusable quote {} = {} per {}",
                        quote.currency,
                        quote.rate,
                        quote.unit
                    );
                    None
                }
            })
            .collect();

        let tx = store.begin()?;
        let rates = RateTable::new(&tx);
        let mut written = 0;

        for (code, rate, date) in &normalized {
            rates.upsert(code, &self.reference, *date, *rate)?;
            written += 1;
            if let Some(reverse) = Decimal::ONE.checked_div(*rate) {
                rates.upsert(&self.reference, code, *date, reverse)?;
                written += 1;
            }
        }

        if self.write_all_pairs {
            for (from, from_rate, from_date) in &normalized {
                for (to, to_rate, to_date) in &normalized {
                    if from == to {
                        continue;
                    }
                    if let Some(cross) = from_rate.checked_div(*to_rate) {
                        rates.upsert(from, to, *from_date.min(to_date), cross)?;
                        written += 1;
                    }
                }
            }
        }

        tx.commit()?;
        log::info!(
            "Ingested {} rate rows for {} against {}",
            written,
            snapshot.date,
            self.reference
        );
        Ok(written)
    }

    /// Fetch from `feed` and ingest the result
    pub fn refresh(&self, store: &mut Store, feed: &dyn RateFeed) -> Result<usize> {
        let snapshot = feed.fetch()?;
        log::debug!(
            "Feed {} returned {} quotes for {}",
            feed.name(),
            snapshot.quotes.len(),
            snapshot.date
        );
        self.ingest(store, &snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fx::RateSource;
    use rust_decimal_macros::dec;

    fn code(s: &str) -> CurrencyCode {
        CurrencyCode::new(s).unwrap()
    }

    fn snapshot() -> FeedSnapshot {
        FeedSnapshot {
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            quotes: vec![
                PublishedRate::new(code("USD"), dec!(3.70), 1),
                PublishedRate::new(code("EUR"), dec!(4.00), 1),
                PublishedRate::new(code("JPY"), dec!(2.50), 100),
                PublishedRate::new(code("ILS"), dec!(1), 1),
                PublishedRate::new(code("XXX"), dec!(0), 1),
            ],
        }
    }

    #[test]
    fn test_per_unit() {
        assert_eq!(PublishedRate::new(code("JPY"), dec!(2.50), 100).per_unit(), Some(dec!(0.025)));
        assert_eq!(PublishedRate::new(code("JPY"), dec!(2.50), 0).per_unit(), None);
        assert_eq!(PublishedRate::new(code("JPY"), dec!(-1), 1).per_unit(), None);
    }

    #[test]
    fn test_ingest_writes_both_directions() {
        let mut store = Store::new_in_memory().unwrap();
        let ingestor = RateIngestor::new(code("ILS"));
        let snap = snapshot();

        let written = ingestor.ingest(&mut store, &snap).unwrap();
        assert_eq!(written, 6);

        let rates = store.rates();
        let jpy = rates.most_recent_rate(&code("JPY"), &code("ILS"), snap.date).unwrap().unwrap();
        assert_eq!(jpy.rate, dec!(0.025));
        let ils_usd = rates.most_recent_rate(&code("ILS"), &code("USD"), snap.date).unwrap().unwrap();
        assert_eq!(ils_usd.rate, Decimal::ONE / dec!(3.70));
        assert!(rates.most_recent_rate(&code("USD"), &code("EUR"), snap.date).unwrap().is_none());
    }

    #[test]
    fn test_ingest_all_pairs_and_reingest_upserts() {
        let mut store = Store::new_in_memory().unwrap();
        let ingestor = RateIngestor::new(code("ILS")).with_all_pairs(true);
        let snap = snapshot();

        assert_eq!(ingestor.ingest(&mut store, &snap).unwrap(), 12);
        let usd_eur = store
            .rates()
            .most_recent_rate(&code("USD"), &code("EUR"), snap.date)
            .unwrap()
            .unwrap();
        assert_eq!(usd_eur.rate, dec!(0.925));

        // Same day again replaces rows instead of duplicating them
        ingestor.ingest(&mut store, &snap).unwrap();
        assert_eq!(store.rates().count().unwrap(), 12);
    }

    #[test]
    fn test_refresh_from_static_feed() {
        let mut store = Store::new_in_memory().unwrap();
        let feed = StaticRateFeed::new(snapshot());
        let written = RateIngestor::new(code("ILS")).refresh(&mut store, &feed).unwrap();
        assert_eq!(written, 6);
        assert_eq!(feed.name(), "static");
    }

    #[test]
    fn test_parse_exchange_rates() {
        let body = r#"{
            "exchangeRates": [
                {"key": "USD", "currentExchangeRate": 3.702, "currentChange": 0.1, "unit": 1, "lastUpdate": "2024-05-01T12:15:00.000Z"},
                {"key": "JPY", "currentExchangeRate": 2.4123, "unit": 100, "lastUpdate": "2024-04-30T12:15:00.000Z"},
                {"key": "eur", "currentExchangeRate": 4, "lastUpdate": "2024-05-01T12:15:00.000Z"},
                {"key": "BOGUS", "currentExchangeRate": 1.0, "unit": 1}
            ]
        }"#;
        let fallback = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let snap = parse_exchange_rates(body, fallback).unwrap();

        let may_1 = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let apr_30 = NaiveDate::from_ymd_opt(2024, 4, 30).unwrap();
        assert_eq!(snap.date, may_1);
        assert_eq!(snap.quotes.len(), 3);
        assert_eq!(snap.quotes[0].rate, dec!(3.702));
        assert_eq!(snap.quotes[0].date, Some(may_1));
        assert_eq!(snap.quotes[1].unit, 100);
        assert_eq!(snap.quotes[1].date, Some(apr_30));
        assert_eq!(snap.quotes[2].currency, code("EUR"));
        assert_eq!(snap.quotes[2].unit, 1);

        // The JPY row lands on its own lastUpdate day, not the snapshot day
        let mut store = Store::new_in_memory().unwrap();
        RateIngestor::new(code("ILS")).ingest(&mut store, &snap).unwrap();
        let rates = store.rates();
        assert_eq!(rates.on_date(&code("JPY"), &code("ILS"), apr_30).unwrap().map(|q| q.rate), Some(dec!(0.024123)));
        assert_eq!(rates.on_date(&code("JPY"), &code("ILS"), may_1).unwrap().map(|q| q.rate), None);
        assert!(rates.on_date(&code("ILS"), &code("JPY"), apr_30).unwrap().is_some());
        assert_eq!(rates.on_date(&code("USD"), &code("ILS"), may_1).unwrap().map(|q| q.rate), Some(dec!(3.702)));
    }

    #[test]
    fn test_stale_quote_keeps_its_day() {
        let may_1 = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let apr_26 = NaiveDate::from_ymd_opt(2024, 4, 26).unwrap();
        let snap = FeedSnapshot {
            date: may_1,
            quotes: vec![
                PublishedRate::new(code("USD"), dec!(3.70), 1).with_date(may_1),
                PublishedRate::new(code("JPY"), dec!(2.41), 100).with_date(apr_26),
                PublishedRate::new(code("EUR"), dec!(4.00), 1),
            ],
        };
        let mut store = Store::new_in_memory().unwrap();
        let written = RateIngestor::new(code("ILS")).with_all_pairs(true).ingest(&mut store, &snap).unwrap();
        assert_eq!(written, 12);

        let rates = store.rates();
        assert_eq!(rates.on_date(&code("JPY"), &code("ILS"), may_1).unwrap().map(|q| q.rate), None);
        let jpy = rates.most_recent_rate(&code("JPY"), &code("ILS"), may_1).unwrap().unwrap();
        assert_eq!(jpy.date, apr_26);
        assert_eq!(jpy.rate, dec!(0.0241));

        // Undated quotes fall back to the snapshot day
        assert_eq!(rates.on_date(&code("EUR"), &code("ILS"), may_1).unwrap().map(|q| q.rate), Some(dec!(4.00)));

        // A cross pair is only as fresh as its older leg
        let usd_jpy = rates.most_recent_rate(&code("USD"), &code("JPY"), may_1).unwrap().unwrap();
        assert_eq!(usd_jpy.date, apr_26);
        let usd_eur = rates.most_recent_rate(&code("USD"), &code("EUR"), may_1).unwrap().unwrap();
        assert_eq!(usd_eur.date, may_1);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let fallback = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let err = parse_exchange_rates("<xml/>", fallback).unwrap_err();
        assert_eq!(err.kind(), "feed_error");

        let empty = parse_exchange_rates(r#"{"exchangeRates": []}"#, fallback).unwrap();
        assert_eq!(empty.date, fallback);
        assert!(empty.quotes.is_empty());
    }
}
