//! SQLite persistence
//!
//! [`Store`] owns the connection. The table accessors borrow any
//! `&Connection`, including an open `rusqlite::Transaction`, so the same
//! code serves plain reads and reads/writes inside a ledger operation.
//!
//! Ledger operations begin with `BEGIN IMMEDIATE`, which takes the database
//! write lock up front. Two operations on the same wallet row therefore
//! serialize; the balance check and the debit can never interleave with
//! another writer.

pub mod rates;
pub mod transactions;
pub mod users;
pub mod wallets;

pub use rates::{RateTable, DEFAULT_HISTORY_DAYS, MAX_HISTORY_DAYS};
pub use transactions::TransactionTable;
pub use users::{User, UserDirectory, UserTable};
pub use wallets::{WalletBalance, WalletTable};

use crate::config::LedgerConfig;
use crate::currency::CurrencyCode;
use crate::error::Result;
use rusqlite::types::Type;
use rusqlite::{Connection, Row, Transaction, TransactionBehavior};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

const SCHEMA_SQL: &str = include_str!("schema.sql");

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Ledger database with SQLite backend
pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Store {
    /// Create or open database at path
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Open using the configured path and busy timeout
    pub fn open_with_config(config: &LedgerConfig) -> Result<Self> {
        Self::open_with_timeout(&config.database_path, config.busy_timeout())
    }

    /// Create or open database at path, waiting up to `busy_timeout` for locks
    pub fn open_with_timeout(path: &Path, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        // WAL lets readers keep a consistent snapshot while a writer commits
        let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        log::debug!("Opened {} (journal_mode={})", path.display(), mode);

        Self::initialize(&conn)?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Create in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::initialize(&conn)?;
        Ok(Self { conn, path: None })
    }

    fn initialize(conn: &Connection) -> Result<()> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    /// Database file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Begin an atomic unit holding the write lock until commit or drop.
    ///
    /// Dropping the returned transaction without committing rolls it back.
    pub fn begin(&mut self) -> Result<Transaction<'_>> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }

    pub fn rates(&self) -> RateTable<'_> {
        RateTable::new(&self.conn)
    }

    pub fn wallets(&self) -> WalletTable<'_> {
        WalletTable::new(&self.conn)
    }

    pub fn transactions(&self) -> TransactionTable<'_> {
        TransactionTable::new(&self.conn)
    }

    pub fn users(&self) -> UserTable<'_> {
        UserTable::new(&self.conn)
    }
}

/// Read a decimal stored as TEXT
pub(crate) fn decimal_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn currency_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<CurrencyCode> {
    let text: String = row.get(idx)?;
    CurrencyCode::new(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
