//! Ledger configuration
//!
//! Loaded from TOML. Every field has a default, so an empty file is a valid
//! configuration:
//!
//! ```toml
//! database_path = "wallet.db"
//! reference_currency = "ILS"
//! balance_scale = 2
//!
//! [refresh]
//! mode = "background"
//! interval_secs = 3600
//!
//! [feed]
//! url = "https://www.boi.org.il/PublicApi/GetExchangeRates"
//! ```

use crate::currency::CurrencyCode;
use crate::error::{LedgerError, Result};
use crate::types::DEFAULT_BALANCE_SCALE;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// When the stored rate table is refreshed from the external feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Rates are only ever written by an outside process
    Disabled,
    /// Every conversion first pulls the full feed
    BeforeConvert,
    /// A background task pulls the feed on a fixed interval
    Background { interval_secs: u64 },
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        RefreshPolicy::Disabled
    }
}

/// External rate feed settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_feed_url")]
    pub url: String,
    #[serde(default = "default_feed_timeout")]
    pub timeout_secs: u64,
    /// Also write every X->Y cross pair, not just X->REF and REF->X
    #[serde(default)]
    pub write_all_pairs: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            timeout_secs: default_feed_timeout(),
            write_all_pairs: false,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// Anchor currency for cross-rate derivation
    #[serde(default = "default_reference_currency")]
    pub reference_currency: String,
    /// Decimal places kept on stored balances
    #[serde(default = "default_balance_scale")]
    pub balance_scale: u32,
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
    #[serde(default)]
    pub refresh: RefreshPolicy,
    #[serde(default)]
    pub feed: FeedConfig,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("fx-ledger.db")
}

fn default_reference_currency() -> String {
    "ILS".to_string()
}

fn default_balance_scale() -> u32 {
    DEFAULT_BALANCE_SCALE
}

fn default_busy_timeout() -> u64 {
    5_000
}

fn default_feed_url() -> String {
    "https://www.boi.org.il/PublicApi/GetExchangeRates".to_string()
}

fn default_feed_timeout() -> u64 {
    10
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            reference_currency: default_reference_currency(),
            balance_scale: default_balance_scale(),
            busy_timeout_ms: default_busy_timeout(),
            refresh: RefreshPolicy::default(),
            feed: FeedConfig::default(),
        }
    }
}

impl LedgerConfig {
    /// Read and validate a TOML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)
            .map_err(|e| LedgerError::Config(format!("{}: {}", path.display(), e)))?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: LedgerConfig =
            toml::from_str(contents).map_err(|e| LedgerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        CurrencyCode::new(&self.reference_currency).map_err(|_| {
            LedgerError::Config(format!(
                "reference_currency must be a 3-letter uppercase code, got {:?}",
                self.reference_currency
            ))
        })?;
        if self.balance_scale > 8 {
            return Err(LedgerError::Config(format!(
                "balance_scale must be at most 8, got {}",
                self.balance_scale
            )));
        }
        if let RefreshPolicy::Background { interval_secs: 0 } = self.refresh {
            return Err(LedgerError::Config(
                "background refresh interval must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// The reference currency as a validated code
    pub fn reference(&self) -> Result<CurrencyCode> {
        CurrencyCode::new(&self.reference_currency)
            .map_err(|_| LedgerError::Config(format!("bad reference currency {:?}", self.reference_currency)))
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}
