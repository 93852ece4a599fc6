//! Wallet balances, one row per (user, currency)
//!
//! A missing row is a zero balance. Rows are created on first credit and
//! never deleted. Callers are expected to run `credit`/`debit` inside a
//! transaction from [`Store::begin`](super::Store::begin).

use super::{currency_column, decimal_column};
use crate::currency::CurrencyCode;
use crate::error::{LedgerError, Result};
use crate::types::{Amount, Timestamp, UserId};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Balance of one wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletBalance {
    pub user_id: UserId,
    pub currency: CurrencyCode,
    pub balance: Amount,
    pub updated_at: Timestamp,
}

/// Accessor for the `wallets` table
pub struct WalletTable<'c> {
    conn: &'c Connection,
}

impl<'c> WalletTable<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Stored balance, `None` when the wallet was never credited
    pub fn balance(&self, user_id: UserId, currency: &CurrencyCode) -> Result<Option<Amount>> {
        let balance = self
            .conn
            .query_row(
                "SELECT balance FROM wallets WHERE user_id = ?1 AND currency = ?2",
                params![user_id, currency.as_str()],
                |row| decimal_column(row, 0),
            )
            .optional()?;
        Ok(balance)
    }

    /// Add `amount`, creating the wallet if needed. Returns the new balance.
    pub fn credit(&self, user_id: UserId, currency: &CurrencyCode, amount: Amount) -> Result<Amount> {
        let current = self.balance(user_id, currency)?.unwrap_or(Decimal::ZERO);
        let updated = current.checked_add(amount).ok_or_else(|| {
            LedgerError::InvalidAmount(format!("balance overflow crediting {} {}", amount, currency))
        })?;
        self.write(user_id, currency, updated)?;
        Ok(updated)
    }

    /// Subtract `amount`. Fails without writing if the wallet is missing or short.
    pub fn debit(&self, user_id: UserId, currency: &CurrencyCode, amount: Amount) -> Result<Amount> {
        let available = self.balance(user_id, currency)?.unwrap_or(Decimal::ZERO);
        if available < amount {
            return Err(LedgerError::InsufficientFunds {
                currency: currency.to_string(),
                requested: amount,
                available,
            });
        }
        let updated = available - amount;
        self.write(user_id, currency, updated)?;
        Ok(updated)
    }

    /// All wallets of a user, ordered by currency
    pub fn list(&self, user_id: UserId) -> Result<Vec<WalletBalance>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, currency, balance, updated_at FROM wallets
             WHERE user_id = ?1 ORDER BY currency",
        )?;
        let wallets = stmt
            .query_map(params![user_id], |row| {
                Ok(WalletBalance {
                    user_id: row.get(0)?,
                    currency: currency_column(row, 1)?,
                    balance: decimal_column(row, 2)?,
                    updated_at: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(wallets)
    }

    fn write(&self, user_id: UserId, currency: &CurrencyCode, balance: Amount) -> Result<()> {
        self.conn.execute(
            "INSERT INTO wallets (user_id, currency, balance, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (user_id, currency) DO UPDATE
             SET balance = excluded.balance, updated_at = excluded.updated_at",
            params![user_id, currency.as_str(), balance.to_string(), Utc::now()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use rust_decimal_macros::dec;

    fn usd() -> CurrencyCode {
        CurrencyCode::new("USD").unwrap()
    }

    #[test]
    fn test_missing_wallet_is_none() {
        let store = Store::new_in_memory().unwrap();
        assert_eq!(store.wallets().balance(1, &usd()).unwrap(), None);
        assert!(store.wallets().list(1).unwrap().is_empty());
    }

    #[test]
    fn test_credit_creates_and_accumulates() {
        let store = Store::new_in_memory().unwrap();
        let wallets = store.wallets();
        assert_eq!(wallets.credit(1, &usd(), dec!(100)).unwrap(), dec!(100));
        assert_eq!(wallets.credit(1, &usd(), dec!(0.50)).unwrap(), dec!(100.50));
        assert_eq!(wallets.balance(1, &usd()).unwrap(), Some(dec!(100.50)));
    }

    #[test]
    fn test_debit_rejects_overdraft_without_writing() {
        let store = Store::new_in_memory().unwrap();
        let wallets = store.wallets();
        wallets.credit(1, &usd(), dec!(5)).unwrap();

        match wallets.debit(1, &usd(), dec!(10)) {
            Err(LedgerError::InsufficientFunds { requested, available, .. }) => {
                assert_eq!(requested, dec!(10));
                assert_eq!(available, dec!(5));
            }
            other => panic!("expected InsufficientFunds, got {:?}", other),
        }
        assert_eq!(wallets.balance(1, &usd()).unwrap(), Some(dec!(5)));
    }

    #[test]
    fn test_debit_missing_wallet() {
        let store = Store::new_in_memory().unwrap();
        let err = store.wallets().debit(7, &usd(), dec!(1)).unwrap_err();
        assert_eq!(err.kind(), "insufficient_funds");
        assert_eq!(store.wallets().balance(7, &usd()).unwrap(), None);
    }

    #[test]
    fn test_debit_to_zero_keeps_row() {
        let store = Store::new_in_memory().unwrap();
        let wallets = store.wallets();
        wallets.credit(1, &usd(), dec!(5)).unwrap();
        assert_eq!(wallets.debit(1, &usd(), dec!(5)).unwrap(), Decimal::ZERO);
        assert_eq!(wallets.balance(1, &usd()).unwrap(), Some(Decimal::ZERO));
    }

    #[test]
    fn test_list_sorted_by_currency() {
        let store = Store::new_in_memory().unwrap();
        let wallets = store.wallets();
        for code in ["USD", "EUR", "ILS"] {
            wallets.credit(3, &CurrencyCode::new(code).unwrap(), dec!(1)).unwrap();
        }
        wallets.credit(4, &usd(), dec!(9)).unwrap();

        let listed: Vec<_> = wallets.list(3).unwrap().into_iter().map(|w| w.currency.to_string()).collect();
        assert_eq!(listed, vec!["EUR", "ILS", "USD"]);
    }
}
