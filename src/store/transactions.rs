//! Transaction log table
//!
//! Append-only. The schema triggers reject deletes and every update except
//! the `balance_after` patch a deposit performs right after insertion.

use super::{currency_column, decimal_column};
use crate::error::Result;
use crate::ledger::transaction::{NewTransaction, TransactionRecord, TransactionStatus, TransactionType};
use crate::types::{Amount, TransactionId, UserId};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

const SELECT_COLUMNS: &str = "SELECT id, user_id, type, currency_from, currency_to, amount, rate, \
     balance_after, status, counterparty_id, created_at FROM transactions";

/// Accessor for the `transactions` table
pub struct TransactionTable<'c> {
    conn: &'c Connection,
}

impl<'c> TransactionTable<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Insert a record and return its assigned id
    pub fn append(&self, txn: &NewTransaction) -> Result<TransactionId> {
        self.conn.execute(
            "INSERT INTO transactions
             (user_id, type, currency_from, currency_to, amount, rate, balance_after, status, counterparty_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                txn.user_id,
                txn.kind.as_str(),
                txn.currency_from.as_str(),
                txn.currency_to.as_str(),
                txn.amount.to_string(),
                txn.rate.to_string(),
                txn.balance_after.to_string(),
                txn.status.as_str(),
                txn.counterparty_id,
                txn.created_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Correct `balance_after` on a freshly inserted record
    pub fn set_balance_after(&self, id: TransactionId, balance_after: Amount) -> Result<()> {
        self.conn.execute(
            "UPDATE transactions SET balance_after = ?1 WHERE id = ?2",
            params![balance_after.to_string(), id],
        )?;
        Ok(())
    }

    pub fn get(&self, id: TransactionId) -> Result<Option<TransactionRecord>> {
        let record = self
            .conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_COLUMNS),
                params![id],
                record_from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Most recent records of a user, newest first
    pub fn for_user(&self, user_id: UserId, limit: u32) -> Result<Vec<TransactionRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE user_id = ?1 ORDER BY id DESC LIMIT ?2",
            SELECT_COLUMNS
        ))?;
        let records = stmt
            .query_map(params![user_id, limit], record_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn count_for_user(&self, user_id: UserId) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<TransactionRecord> {
    let kind: String = row.get(2)?;
    let status: String = row.get(8)?;
    Ok(TransactionRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: TransactionType::parse(&kind)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?,
        currency_from: currency_column(row, 3)?,
        currency_to: currency_column(row, 4)?,
        amount: decimal_column(row, 5)?,
        rate: decimal_column(row, 6)?,
        balance_after: decimal_column(row, 7)?,
        status: TransactionStatus::parse(&status)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(8, Type::Text, Box::new(e)))?,
        counterparty_id: row.get(9)?,
        created_at: row.get(10)?,
    })
}
