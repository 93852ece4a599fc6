//! Read side: balances, history and rate lookups

use super::transaction::TransactionRecord;
use super::{today, Ledger};
use crate::currency::CurrencyCode;
use crate::error::{LedgerError, Result};
use crate::fx::{RateQuote, ResolvedRate};
use crate::store::WalletBalance;
use crate::types::{round_money, Amount, UserId};
use chrono::NaiveDate;
use rust_decimal::Decimal;

impl Ledger {
    /// Current balance, `None` if the user never held `currency`
    pub fn balance(&self, user_id: UserId, currency: &CurrencyCode) -> Result<Option<Amount>> {
        self.store.wallets().balance(user_id, currency)
    }

    /// All wallets of a user ordered by currency
    pub fn balances(&self, user_id: UserId) -> Result<Vec<WalletBalance>> {
        self.store.wallets().list(user_id)
    }

    /// Most recent transaction records, newest first
    pub fn history(&self, user_id: UserId, limit: u32) -> Result<Vec<TransactionRecord>> {
        self.store.transactions().for_user(user_id, limit)
    }

    /// Rate that a conversion would use right now
    pub fn quote(&self, from: &CurrencyCode, to: &CurrencyCode) -> Result<ResolvedRate> {
        self.resolver.resolve(&self.store.rates(), from, to, today())
    }

    /// Stored rates for a pair, oldest first (see [`RateTable::history`](crate::store::RateTable::history))
    pub fn rate_history(&self, from: &CurrencyCode, to: &CurrencyCode, limit: u32) -> Result<Vec<RateQuote>> {
        self.store.rates().history(from, to, limit)
    }

    /// Stored rate for exactly `date`
    pub fn rate_on(&self, from: &CurrencyCode, to: &CurrencyCode, date: NaiveDate) -> Result<Option<RateQuote>> {
        self.store.rates().on_date(from, to, date)
    }

    /// Value of all of a user's wallets in `target`.
    ///
    /// Zero balances are skipped. Any other wallet without a resolvable rate
    /// fails the whole valuation with `RateNotFound`.
    pub fn portfolio_value(&self, user_id: UserId, target: &CurrencyCode) -> Result<Amount> {
        let rates = self.store.rates();
        let as_of = today();
        let mut total = Decimal::ZERO;

        for wallet in self.balances(user_id)? {
            if wallet.balance.is_zero() {
                continue;
            }
            let resolved = self.resolver.resolve(&rates, &wallet.currency, target, as_of)?;
            total = resolved
                .apply(wallet.balance)
                .and_then(|v| total.checked_add(v))
                .ok_or_else(|| LedgerError::InvalidAmount(format!("portfolio value overflows in {}", target)))?;
        }

        Ok(round_money(total, self.balance_scale))
    }
}
