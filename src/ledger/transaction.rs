//! Transaction records - the append-only audit log
//!
//! Every balance mutation writes one record per affected party. A transfer
//! writes two: `Transfer` for the sender and `Receive` for the recipient.

use crate::currency::CurrencyCode;
use crate::error::{LedgerError, Result};
use crate::types::{Amount, Rate, Timestamp, TransactionId, UserId};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of ledger movement a record documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    Withdraw,
    Transfer,
    Receive,
    Convert,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdraw => "withdraw",
            TransactionType::Transfer => "transfer",
            TransactionType::Receive => "receive",
            TransactionType::Convert => "convert",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "deposit" => Ok(TransactionType::Deposit),
            "withdraw" => Ok(TransactionType::Withdraw),
            "transfer" => Ok(TransactionType::Transfer),
            "receive" => Ok(TransactionType::Receive),
            "convert" => Ok(TransactionType::Convert),
            other => Err(LedgerError::Config(format!("unknown transaction type {:?}", other))),
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome recorded on a transaction row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "completed" => Ok(TransactionStatus::Completed),
            "failed" => Ok(TransactionStatus::Failed),
            other => Err(LedgerError::Config(format!("unknown transaction status {:?}", other))),
        }
    }
}

/// A stored transaction record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: TransactionId,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub currency_from: CurrencyCode,
    pub currency_to: CurrencyCode,
    /// In `currency_from` units
    pub amount: Amount,
    pub rate: Rate,
    /// Post-operation balance of the user's primary currency for this row
    pub balance_after: Amount,
    pub status: TransactionStatus,
    pub counterparty_id: Option<UserId>,
    pub created_at: Timestamp,
}

impl TransactionRecord {
    /// Whether the record moved money between two users
    pub fn is_transfer(&self) -> bool {
        matches!(self.kind, TransactionType::Transfer | TransactionType::Receive)
    }

    /// Amount in `currency_to` units (`amount * rate`), full precision
    pub fn converted_amount(&self) -> Option<Amount> {
        self.amount.checked_mul(self.rate)
    }
}

/// A record about to be appended; the store assigns the id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub user_id: UserId,
    pub kind: TransactionType,
    pub currency_from: CurrencyCode,
    pub currency_to: CurrencyCode,
    pub amount: Amount,
    pub rate: Rate,
    pub balance_after: Amount,
    pub status: TransactionStatus,
    pub counterparty_id: Option<UserId>,
    pub created_at: Timestamp,
}

impl NewTransaction {
    fn single_currency(
        user_id: UserId,
        kind: TransactionType,
        currency: &CurrencyCode,
        amount: Amount,
        balance_after: Amount,
    ) -> Self {
        Self {
            user_id,
            kind,
            currency_from: currency.clone(),
            currency_to: currency.clone(),
            amount,
            rate: Decimal::ONE,
            balance_after,
            status: TransactionStatus::Completed,
            counterparty_id: None,
            created_at: Utc::now(),
        }
    }

    /// Deposit with rate 1
    pub fn deposit(user_id: UserId, currency: &CurrencyCode, amount: Amount, balance_after: Amount) -> Self {
        Self::single_currency(user_id, TransactionType::Deposit, currency, amount, balance_after)
    }

    /// Withdrawal with rate 1
    pub fn withdraw(user_id: UserId, currency: &CurrencyCode, amount: Amount, balance_after: Amount) -> Self {
        Self::single_currency(user_id, TransactionType::Withdraw, currency, amount, balance_after)
    }

    /// Conversion within one user's wallets; `balance_after` is the target currency's
    pub fn convert(
        user_id: UserId,
        from: &CurrencyCode,
        to: &CurrencyCode,
        amount: Amount,
        rate: Rate,
        balance_after: Amount,
    ) -> Self {
        Self {
            currency_to: to.clone(),
            rate,
            ..Self::single_currency(user_id, TransactionType::Convert, from, amount, balance_after)
        }
    }

    /// One side of a transfer, `kind` is `Transfer` or `Receive`
    #[allow(clippy::too_many_arguments)]
    pub fn transfer_leg(
        kind: TransactionType,
        user_id: UserId,
        counterparty_id: UserId,
        from: &CurrencyCode,
        to: &CurrencyCode,
        amount: Amount,
        rate: Rate,
        balance_after: Amount,
    ) -> Self {
        Self {
            currency_to: to.clone(),
            rate,
            counterparty_id: Some(counterparty_id),
            ..Self::single_currency(user_id, kind, from, amount, balance_after)
        }
    }
}
