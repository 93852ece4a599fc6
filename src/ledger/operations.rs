//! Deposit, withdraw, convert and transfer
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! - convert: amount, same currency, balance, rate
//! - transfer: amount, recipient, self-transfer, balance, rate
//!
//! Everything after the amount check happens inside the write transaction,
//! so a balance that passed the check cannot change before the debit.

use super::transaction::{NewTransaction, TransactionType};
use super::{today, Ledger};
use crate::currency::CurrencyCode;
use crate::error::{LedgerError, Result};
use crate::fx::{Resolution, ResolvedRate};
use crate::store::{RateTable, TransactionTable, UserDirectory, UserTable, WalletTable};
use crate::types::{round_money, validate_amount, Amount, Rate, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Result of a conversion between two of a user's wallets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionOutcome {
    pub converted_amount: Amount,
    pub from_balance: Amount,
    pub to_balance: Amount,
    pub rate: Rate,
    pub resolution: Resolution,
}

/// Result of a transfer, from the sender's point of view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOutcome {
    pub to_user_id: UserId,
    pub converted_amount: Amount,
    pub from_new_balance: Amount,
    pub rate: Rate,
    pub resolution: Resolution,
}

impl Ledger {
    /// Credit `amount` to the user's wallet, creating it on first use.
    /// Returns the new balance.
    pub fn deposit(&mut self, user_id: UserId, currency: &CurrencyCode, amount: Amount) -> Result<Amount> {
        let result = self.try_deposit(user_id, currency, amount);
        log_rejection("deposit", user_id, &result);
        result
    }

    /// Debit `amount` from the user's wallet. Returns the new balance.
    pub fn withdraw(&mut self, user_id: UserId, currency: &CurrencyCode, amount: Amount) -> Result<Amount> {
        let result = self.try_withdraw(user_id, currency, amount);
        log_rejection("withdraw", user_id, &result);
        result
    }

    /// Move `amount` of `from` into the user's `to` wallet at the resolved rate
    pub fn convert(
        &mut self,
        user_id: UserId,
        from: &CurrencyCode,
        to: &CurrencyCode,
        amount: Amount,
    ) -> Result<ConversionOutcome> {
        let result = self.try_convert(user_id, from, to, amount);
        log_rejection("convert", user_id, &result);
        result
    }

    /// Send `amount` of `from` to the user registered under `to_email`, who
    /// receives it in `to`
    pub fn transfer(
        &mut self,
        from_user_id: UserId,
        to_email: &str,
        from: &CurrencyCode,
        to: &CurrencyCode,
        amount: Amount,
    ) -> Result<TransferOutcome> {
        let result = self.try_transfer(from_user_id, to_email, from, to, amount);
        log_rejection("transfer", from_user_id, &result);
        result
    }

    fn try_deposit(&mut self, user_id: UserId, currency: &CurrencyCode, amount: Amount) -> Result<Amount> {
        let amount = validate_amount(amount, self.balance_scale)?;

        let tx = self.store.begin()?;
        let log = TransactionTable::new(&tx);
        let wallets = WalletTable::new(&tx);

        // The record goes in first with a placeholder and is patched once
        // the credited balance is known
        let id = log.append(&NewTransaction::deposit(user_id, currency, amount, Decimal::ZERO))?;
        wallets.credit(user_id, currency, amount)?;
        let balance = wallets
            .balance(user_id, currency)?
            .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        log.set_balance_after(id, balance)?;

        tx.commit()?;
        log::info!("Deposit user={} {} {} balance={}", user_id, amount, currency, balance);
        Ok(balance)
    }

    fn try_withdraw(&mut self, user_id: UserId, currency: &CurrencyCode, amount: Amount) -> Result<Amount> {
        let amount = validate_amount(amount, self.balance_scale)?;

        let tx = self.store.begin()?;
        let wallets = WalletTable::new(&tx);
        let balance = wallets.debit(user_id, currency, amount)?;
        TransactionTable::new(&tx).append(&NewTransaction::withdraw(user_id, currency, amount, balance))?;

        tx.commit()?;
        log::info!("Withdraw user={} {} {} balance={}", user_id, amount, currency, balance);
        Ok(balance)
    }

    fn try_convert(
        &mut self,
        user_id: UserId,
        from: &CurrencyCode,
        to: &CurrencyCode,
        amount: Amount,
    ) -> Result<ConversionOutcome> {
        let scale = self.balance_scale;
        let amount = validate_amount(amount, scale)?;
        if from == to {
            return Err(LedgerError::SameCurrency(from.to_string()));
        }

        self.refresh_before_convert();

        let tx = self.store.begin()?;
        let wallets = WalletTable::new(&tx);
        ensure_funds(&wallets, user_id, from, amount)?;

        let resolved = self.resolver.resolve(&RateTable::new(&tx), from, to, today())?;
        let converted_amount = credited_amount(&resolved, amount, scale)?;

        let from_balance = wallets.debit(user_id, from, amount)?;
        let to_balance = wallets.credit(user_id, to, converted_amount)?;
        TransactionTable::new(&tx).append(&NewTransaction::convert(
            user_id,
            from,
            to,
            amount,
            resolved.rate,
            to_balance,
        ))?;

        tx.commit()?;
        log::info!(
            "Convert user={} {} {} -> {} {} rate={} ({})",
            user_id,
            amount,
            from,
            converted_amount,
            to,
            resolved.rate,
            resolved.resolution
        );
        Ok(ConversionOutcome {
            converted_amount,
            from_balance,
            to_balance,
            rate: resolved.rate,
            resolution: resolved.resolution,
        })
    }

    fn try_transfer(
        &mut self,
        from_user_id: UserId,
        to_email: &str,
        from: &CurrencyCode,
        to: &CurrencyCode,
        amount: Amount,
    ) -> Result<TransferOutcome> {
        let scale = self.balance_scale;
        let amount = validate_amount(amount, scale)?;

        let tx = self.store.begin()?;
        let to_user_id = UserTable::new(&tx)
            .lookup_user_by_email(to_email)?
            .ok_or_else(|| LedgerError::RecipientNotFound(to_email.trim().to_string()))?;
        if to_user_id == from_user_id {
            return Err(LedgerError::SelfTransferForbidden);
        }

        let wallets = WalletTable::new(&tx);
        ensure_funds(&wallets, from_user_id, from, amount)?;

        let resolved = self.resolver.resolve(&RateTable::new(&tx), from, to, today())?;
        let converted_amount = credited_amount(&resolved, amount, scale)?;

        let from_new_balance = wallets.debit(from_user_id, from, amount)?;
        let to_new_balance = wallets.credit(to_user_id, to, converted_amount)?;

        let log = TransactionTable::new(&tx);
        log.append(&NewTransaction::transfer_leg(
            TransactionType::Transfer,
            from_user_id,
            to_user_id,
            from,
            to,
            amount,
            resolved.rate,
            from_new_balance,
        ))?;
        log.append(&NewTransaction::transfer_leg(
            TransactionType::Receive,
            to_user_id,
            from_user_id,
            from,
            to,
            amount,
            resolved.rate,
            to_new_balance,
        ))?;

        tx.commit()?;
        log::info!(
            "Transfer user={} -> user={} {} {} -> {} {} rate={}",
            from_user_id,
            to_user_id,
            amount,
            from,
            converted_amount,
            to,
            resolved.rate
        );
        Ok(TransferOutcome {
            to_user_id,
            converted_amount,
            from_new_balance,
            rate: resolved.rate,
            resolution: resolved.resolution,
        })
    }
}

fn ensure_funds(wallets: &WalletTable<'_>, user_id: UserId, currency: &CurrencyCode, amount: Amount) -> Result<()> {
    let available = wallets.balance(user_id, currency)?.unwrap_or(Decimal::ZERO);
    if available < amount {
        return Err(LedgerError::InsufficientFunds {
            currency: currency.to_string(),
            requested: amount,
            available,
        });
    }
    Ok(())
}

/// `amount * rate` rounded to the balance scale; a credit that rounds to zero is rejected
fn credited_amount(resolved: &ResolvedRate, amount: Amount, scale: u32) -> Result<Amount> {
    let exact = resolved.apply(amount).ok_or_else(|| {
        LedgerError::InvalidAmount(format!("{} {} overflows at rate {}", amount, resolved.from, resolved.rate))
    })?;
    let credited = round_money(exact, scale);
    if credited <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(format!(
            "{} {} is worth less than the smallest unit of {}",
            amount, resolved.from, resolved.to
        )));
    }
    Ok(credited)
}

fn log_rejection<T>(operation: &str, user_id: UserId, result: &Result<T>) {
    if let Err(e) = result {
        if e.is_rejection() {
            log::debug!("{} rejected for user={}: {}", operation, user_id, e);
        } else {
            log::warn!("{} failed for user={}: {}", operation, user_id, e);
        }
    }
}
