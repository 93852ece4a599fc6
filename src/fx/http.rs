//! Central-bank rate feed over HTTP

use super::feed::{parse_exchange_rates, FeedSnapshot, RateFeed};
use crate::config::FeedConfig;
use crate::error::{LedgerError, Result};
use chrono::Utc;
use reqwest::blocking::Client;
use std::time::Duration;

/// Fetches the published exchange-rate document from a URL
///
/// Uses the blocking client: callers are either synchronous ledger code or
/// a `spawn_blocking` worker.
pub struct HttpRateFeed {
    client: Client,
    url: String,
}

impl HttpRateFeed {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LedgerError::Feed(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn from_config(config: &FeedConfig) -> Result<Self> {
        Self::new(config.url.clone(), Duration::from_secs(config.timeout_secs))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl RateFeed for HttpRateFeed {
    fn fetch(&self) -> Result<FeedSnapshot> {
        let response = self
            .client
            .get(&self.url)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| LedgerError::Feed(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(LedgerError::Feed(format!(
                "Rate feed returned error: {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .map_err(|e| LedgerError::Feed(format!("Failed to read response: {}", e)))?;

        parse_exchange_rates(&body, Utc::now().date_naive())
    }

    fn name(&self) -> &str {
        "http"
    }
}
