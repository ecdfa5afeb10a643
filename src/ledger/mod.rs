use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;

use crate::clock::{Clock, SystemClock};
use crate::models::{Amount, Asset};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("insufficient {asset} balance in {account}: required {required}, available {available}")]
    InsufficientBalance {
        account: String,
        asset: Asset,
        required: Amount,
        available: Amount,
    },

    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("{asset} balance overflow in {account}")]
    Overflow { account: String, asset: Asset },

    #[error("transfer from {0} to itself")]
    SelfTransfer(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Deposit,
    Withdrawal,
    /// Debit side of an internal transfer.
    TransferOut,
    /// Credit side of an internal transfer.
    TransferIn,
}

/// One line of the append-only audit journal.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    pub seq: u64,
    pub at: DateTime<Utc>,
    pub kind: EntryKind,
    pub account: String,
    pub counterparty: Option<String>,
    pub asset: Asset,
    pub amount: Amount,
    pub reason: String,
}

/// One movement inside an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferLeg {
    pub from: String,
    pub to: String,
    pub asset: Asset,
    pub amount: Amount,
}

impl TransferLeg {
    pub fn new(from: impl Into<String>, to: impl Into<String>, asset: Asset, amount: Amount) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            asset,
            amount,
        }
    }
}

/// Both asset balances of one account, read under a single lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Balances {
    pub usd: Amount,
    pub util: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetAudit {
    pub asset: Asset,
    pub deposited: u128,
    pub withdrawn: u128,
    pub held: u128,
}

impl AssetAudit {
    pub fn is_balanced(&self) -> bool {
        self.deposited.checked_sub(self.withdrawn) == Some(self.held)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub assets: Vec<AssetAudit>,
}

impl AuditReport {
    pub fn is_balanced(&self) -> bool {
        self.assets.iter().all(AssetAudit::is_balanced)
    }
}

/// Internal per-account balances in USD and UTIL.
///
/// Every movement between accounts goes through [`Ledger::transfer`] or
/// [`Ledger::transfer_batch`] and is journaled with a reason. Market escrow
/// accounts are ordinary accounts here, so the conservation check in
/// [`Ledger::audit`] covers funds locked in markets too.
#[derive(Clone)]
pub struct Ledger {
    inner: Arc<Mutex<LedgerInner>>,
    clock: Arc<dyn Clock>,
}

#[derive(Default)]
struct LedgerInner {
    balances: HashMap<(String, Asset), Amount>,
    journal: Vec<LedgerEntry>,
    deposited: HashMap<Asset, u128>,
    withdrawn: HashMap<Asset, u128>,
}

impl LedgerInner {
    fn balance(&self, account: &str, asset: Asset) -> Amount {
        self.balances
            .get(&(account.to_string(), asset))
            .copied()
            .unwrap_or(0)
    }

    fn record(
        &mut self,
        at: DateTime<Utc>,
        kind: EntryKind,
        account: &str,
        counterparty: Option<&str>,
        asset: Asset,
        amount: Amount,
        reason: &str,
    ) {
        let seq = self.journal.len() as u64 + 1;
        self.journal.push(LedgerEntry {
            seq,
            at,
            kind,
            account: account.to_string(),
            counterparty: counterparty.map(str::to_string),
            asset,
            amount,
            reason: reason.to_string(),
        });
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LedgerInner::default())),
            clock,
        }
    }

    pub fn balance(&self, account: &str, asset: Asset) -> Amount {
        self.inner.lock().balance(account, asset)
    }

    pub fn balances(&self, account: &str) -> Balances {
        let inner = self.inner.lock();
        Balances {
            usd: inner.balance(account, Asset::Usd),
            util: inner.balance(account, Asset::Util),
        }
    }

    /// Credit funds arriving from outside custody. Returns the new balance.
    pub fn deposit(&self, account: &str, asset: Asset, amount: Amount) -> Result<Amount, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        let new_balance = inner
            .balance(account, asset)
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow {
                account: account.to_string(),
                asset,
            })?;

        inner.balances.insert((account.to_string(), asset), new_balance);
        *inner.deposited.entry(asset).or_default() += amount as u128;
        inner.record(now, EntryKind::Deposit, account, None, asset, amount, "deposit");

        tracing::debug!(
            account = %account,
            asset = %asset,
            amount,
            balance = new_balance,
            "Ledger: deposit"
        );
        Ok(new_balance)
    }

    /// Debit funds leaving to outside custody. Returns the new balance.
    pub fn withdraw(&self, account: &str, asset: Asset, amount: Amount) -> Result<Amount, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        let available = inner.balance(account, asset);
        if amount > available {
            return Err(LedgerError::InsufficientBalance {
                account: account.to_string(),
                asset,
                required: amount,
                available,
            });
        }

        let new_balance = available - amount;
        inner.balances.insert((account.to_string(), asset), new_balance);
        *inner.withdrawn.entry(asset).or_default() += amount as u128;
        inner.record(now, EntryKind::Withdrawal, account, None, asset, amount, "withdraw");

        tracing::debug!(
            account = %account,
            asset = %asset,
            amount,
            balance = new_balance,
            "Ledger: withdrawal"
        );
        Ok(new_balance)
    }

    /// Move funds between two internal accounts.
    pub fn transfer(
        &self,
        from: &str,
        to: &str,
        asset: Asset,
        amount: Amount,
        reason: &str,
    ) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        self.transfer_batch(&[TransferLeg::new(from, to, asset, amount)], reason)
    }

    /// Apply every leg or none of them. Zero-amount legs are skipped.
    pub fn transfer_batch(&self, legs: &[TransferLeg], reason: &str) -> Result<(), LedgerError> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        // Dry run against a scratch copy of every touched balance.
        let mut scratch: HashMap<(String, Asset), Amount> = HashMap::new();
        for leg in legs.iter().filter(|l| l.amount > 0) {
            if leg.from == leg.to {
                return Err(LedgerError::SelfTransfer(leg.from.clone()));
            }

            let from_key = (leg.from.clone(), leg.asset);
            let available = scratch
                .get(&from_key)
                .copied()
                .unwrap_or_else(|| inner.balance(&leg.from, leg.asset));
            if leg.amount > available {
                return Err(LedgerError::InsufficientBalance {
                    account: leg.from.clone(),
                    asset: leg.asset,
                    required: leg.amount,
                    available,
                });
            }
            scratch.insert(from_key, available - leg.amount);

            let to_key = (leg.to.clone(), leg.asset);
            let current = scratch
                .get(&to_key)
                .copied()
                .unwrap_or_else(|| inner.balance(&leg.to, leg.asset));
            let credited = current
                .checked_add(leg.amount)
                .ok_or_else(|| LedgerError::Overflow {
                    account: leg.to.clone(),
                    asset: leg.asset,
                })?;
            scratch.insert(to_key, credited);
        }

        inner.balances.extend(scratch);
        for leg in legs.iter().filter(|l| l.amount > 0) {
            inner.record(now, EntryKind::TransferOut, &leg.from, Some(&leg.to), leg.asset, leg.amount, reason);
            inner.record(now, EntryKind::TransferIn, &leg.to, Some(&leg.from), leg.asset, leg.amount, reason);
            tracing::debug!(
                from = %leg.from,
                to = %leg.to,
                asset = %leg.asset,
                amount = leg.amount,
                reason = reason,
                "Ledger: transfer"
            );
        }

        Ok(())
    }

    /// Journal lines touching `account`, oldest first.
    pub fn entries_for(&self, account: &str) -> Vec<LedgerEntry> {
        self.inner
            .lock()
            .journal
            .iter()
            .filter(|e| e.account == account)
            .cloned()
            .collect()
    }

    pub fn journal_len(&self) -> usize {
        self.inner.lock().journal.len()
    }

    /// Per-asset conservation check: held == deposited - withdrawn.
    pub fn audit(&self) -> AuditReport {
        let inner = self.inner.lock();
        let assets = Asset::ALL
            .iter()
            .map(|&asset| {
                let held = inner
                    .balances
                    .iter()
                    .filter(|((_, a), _)| *a == asset)
                    .map(|(_, &v)| v as u128)
                    .sum();
                AssetAudit {
                    asset,
                    deposited: inner.deposited.get(&asset).copied().unwrap_or(0),
                    withdrawn: inner.withdrawn.get(&asset).copied().unwrap_or(0),
                    held,
                }
            })
            .collect();
        AuditReport { assets }
    }
}
