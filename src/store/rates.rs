//! Exchange-rate table
//!
//! One row per (from, to, date). Re-publishing a day replaces the rate.

use super::{currency_column, decimal_column};
use crate::currency::CurrencyCode;
use crate::error::Result;
use crate::fx::{RateQuote, RateSource};
use crate::types::Rate;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Default number of days returned by [`RateTable::history`]
pub const DEFAULT_HISTORY_DAYS: u32 = 30;

/// Upper bound on [`RateTable::history`]
pub const MAX_HISTORY_DAYS: u32 = 365;

/// Accessor for the `exchange_rates` table
pub struct RateTable<'c> {
    conn: &'c Connection,
}

impl<'c> RateTable<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Insert or replace the rate for `from -> to` on `date`
    pub fn upsert(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        date: NaiveDate,
        rate: Rate,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO exchange_rates (currency_from, currency_to, date, rate)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (currency_from, currency_to, date) DO UPDATE SET rate = excluded.rate",
            params![from.as_str(), to.as_str(), date, rate.to_string()],
        )?;
        Ok(())
    }

    /// Latest row dated on or before `as_of`
    pub fn most_recent(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        as_of: NaiveDate,
    ) -> Result<Option<RateQuote>> {
        let quote = self
            .conn
            .query_row(
                "SELECT currency_from, currency_to, rate, date FROM exchange_rates
                 WHERE currency_from = ?1 AND currency_to = ?2 AND date <= ?3
                 ORDER BY date DESC LIMIT 1",
                params![from.as_str(), to.as_str(), as_of],
                quote_from_row,
            )
            .optional()?;
        Ok(quote)
    }

    /// Row for exactly `date`
    pub fn on_date(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        date: NaiveDate,
    ) -> Result<Option<RateQuote>> {
        let quote = self
            .conn
            .query_row(
                "SELECT currency_from, currency_to, rate, date FROM exchange_rates
                 WHERE currency_from = ?1 AND currency_to = ?2 AND date = ?3",
                params![from.as_str(), to.as_str(), date],
                quote_from_row,
            )
            .optional()?;
        Ok(quote)
    }

    /// The `limit` most recent rows for a pair, oldest first.
    ///
    /// `limit` is clamped to `1..=365`.
    pub fn history(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        limit: u32,
    ) -> Result<Vec<RateQuote>> {
        let limit = limit.clamp(1, MAX_HISTORY_DAYS);
        let mut stmt = self.conn.prepare(
            "SELECT currency_from, currency_to, rate, date FROM exchange_rates
             WHERE currency_from = ?1 AND currency_to = ?2
             ORDER BY date DESC LIMIT ?3",
        )?;
        let mut rows = stmt
            .query_map(params![from.as_str(), to.as_str(), limit], quote_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.reverse();
        Ok(rows)
    }

    /// Total number of stored rows
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM exchange_rates", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl RateSource for RateTable<'_> {
    fn most_recent_rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        as_of: NaiveDate,
    ) -> Result<Option<RateQuote>> {
        self.most_recent(from, to, as_of)
    }
}

fn quote_from_row(row: &Row<'_>) -> rusqlite::Result<RateQuote> {
    Ok(RateQuote {
        from: currency_column(row, 0)?,
        to: currency_column(row, 1)?,
        rate: decimal_column(row, 2)?,
        date: row.get(3)?,
    })
}
