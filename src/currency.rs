//! Currency codes and currency pairs
//!
//! The ledger treats a currency as an opaque, validated three-letter key.
//! There is no closed list of supported currencies at this layer.

use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// ISO 4217-style currency code (three ASCII uppercase letters)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Create from an already-normalized code
    pub fn new(code: &str) -> Result<Self> {
        if code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase()) {
            Ok(Self(code.to_string()))
        } else {
            Err(LedgerError::InvalidCurrency(code.to_string()))
        }
    }

    /// Trim and uppercase user input before validating it
    pub fn normalize(input: &str) -> Result<Self> {
        Self::new(&input.trim().to_uppercase())
    }

    /// Get currency code as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get currency symbol for well-known codes, falling back to the code itself
    pub fn symbol(&self) -> &str {
        match self.0.as_str() {
            "USD" => "$",
            "EUR" => "€",
            "GBP" => "£",
            "JPY" => "¥",
            "ILS" => "₪",
            "CHF" => "CHF",
            "CAD" => "C$",
            "AUD" => "A$",
            other => other,
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CurrencyCode {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

impl AsRef<str> for CurrencyCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Ordered currency pair (from -> to)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CurrencyPair {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
}

impl CurrencyPair {
    /// Create new currency pair
    pub fn new(from: CurrencyCode, to: CurrencyCode) -> Self {
        Self { from, to }
    }

    /// Get the inverse pair
    pub fn inverse(&self) -> Self {
        Self {
            from: self.to.clone(),
            to: self.from.clone(),
        }
    }

    /// True when both sides are the same currency
    pub fn is_identity(&self) -> bool {
        self.from == self.to
    }

    /// Parse from "EUR/USD" or "EURUSD"
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let (from, to) = match s.split_once('/') {
            Some((from, to)) => (from, to),
            None if s.len() == 6 && s.is_ascii() => s.split_at(3),
            None => return Err(LedgerError::InvalidCurrency(s.to_string())),
        };
        Ok(Self::new(
            CurrencyCode::normalize(from)?,
            CurrencyCode::normalize(to)?,
        ))
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.from, self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_new() {
        assert_eq!(CurrencyCode::new("USD").unwrap().as_str(), "USD");
        assert!(CurrencyCode::new("usd").is_err());
        assert!(CurrencyCode::new("US").is_err());
        assert!(CurrencyCode::new("USDT").is_err());
        assert!(CurrencyCode::new(" US").is_err());
    }

    #[test]
    fn test_currency_normalize() {
        assert_eq!(CurrencyCode::normalize(" eur ").unwrap().as_str(), "EUR");
        assert!(CurrencyCode::normalize("e1r").is_err());
    }

    #[test]
    fn test_open_currency_set() {
        // Codes outside any fixed list are still accepted
        assert!(CurrencyCode::new("XAU").is_ok());
        assert_eq!(CurrencyCode::new("XAU").unwrap().symbol(), "XAU");
        assert_eq!(CurrencyCode::new("ILS").unwrap().symbol(), "₪");
    }

    #[test]
    fn test_serde_validates() {
        let code: CurrencyCode = serde_json::from_str("\"GBP\"").unwrap();
        assert_eq!(code.to_string(), "GBP");
        assert!(serde_json::from_str::<CurrencyCode>("\"gbp\"").is_err());
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"GBP\"");
    }

    #[test]
    fn test_currency_pair() {
        let pair = CurrencyPair::parse("eur/usd").unwrap();
        assert_eq!(pair.from.as_str(), "EUR");
        assert_eq!(pair.to.as_str(), "USD");
        assert_eq!(format!("{}", pair), "EUR/USD");
        assert_eq!(format!("{}", pair.inverse()), "USD/EUR");
        assert!(!pair.is_identity());

        let compact = CurrencyPair::parse("GBPJPY").unwrap();
        assert_eq!(compact.to.as_str(), "JPY");
        assert!(CurrencyPair::parse("GBP-JPY").is_err());
    }
}
