//! Error types for the wallet ledger

use rust_decimal::Decimal;
use thiserror::Error;

/// Main error type for ledger operations
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid currency code: {0:?}")]
    InvalidCurrency(String),

    #[error("Cannot convert {0} to the same currency")]
    SameCurrency(String),

    #[error("Insufficient funds in {currency}: requested {requested}, available {available}")]
    InsufficientFunds {
        currency: String,
        requested: Decimal,
        available: Decimal,
    },

    #[error("Invalid email address: {0:?}")]
    InvalidEmail(String),

    #[error("Recipient not found: {0}")]
    RecipientNotFound(String),

    #[error("Cannot transfer funds to yourself")]
    SelfTransferForbidden,

    #[error("Exchange rate not found for {from} to {to}")]
    RateNotFound { from: String, to: String },

    #[error("Store failure: {0}")]
    StoreFailure(#[from] rusqlite::Error),

    #[error("Rate feed error: {0}")]
    Feed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LedgerError {
    /// Stable machine-readable code for this error kind
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::InvalidAmount(_) => "invalid_amount",
            LedgerError::InvalidCurrency(_) => "invalid_currency",
            LedgerError::SameCurrency(_) => "same_currency",
            LedgerError::InsufficientFunds { .. } => "insufficient_funds",
            LedgerError::InvalidEmail(_) => "invalid_email",
            LedgerError::RecipientNotFound(_) => "recipient_not_found",
            LedgerError::SelfTransferForbidden => "self_transfer_forbidden",
            LedgerError::RateNotFound { .. } => "rate_not_found",
            LedgerError::StoreFailure(_) => "store_failure",
            LedgerError::Feed(_) => "feed_error",
            LedgerError::Config(_) => "config_error",
            LedgerError::Io(_) => "io_error",
        }
    }

    /// True for errors caused by the request itself rather than the store or environment
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            LedgerError::StoreFailure(_)
                | LedgerError::Feed(_)
                | LedgerError::Config(_)
                | LedgerError::Io(_)
        )
    }
}

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;
