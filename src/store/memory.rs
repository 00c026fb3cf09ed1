//! In-memory storage backends.
//!
//! Each store guards its map with a `std::sync::RwLock`; callers hold the
//! guard only for the duration of a single operation. Serializing the full
//! read-check-write sequence of a mutation is the engine's job, not the
//! store's.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use super::{AccountStore, AuditRecorder, SettingsStore, StoreError, TransactionLedger};
use crate::Amount;
use crate::model::{Account, AccountId, AccountStatus, AuditEntry, Settings, Transaction, TxId};

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("poisoned lock".to_string())
}

/// Account records keyed by id.
#[derive(Default)]
pub struct MemoryAccounts {
    inner: RwLock<HashMap<AccountId, Account>>,
}

impl MemoryAccounts {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccountStore for MemoryAccounts {
    fn get(&self, id: AccountId) -> Result<Account, StoreError> {
        let accounts = self.inner.read().map_err(poisoned)?;
        accounts
            .get(&id)
            .cloned()
            .ok_or(StoreError::AccountNotFound(id))
    }

    fn get_by_username(&self, username: &str) -> Result<Account, StoreError> {
        let accounts = self.inner.read().map_err(poisoned)?;
        accounts
            .values()
            .find(|a| a.username == username)
            .cloned()
            .ok_or_else(|| StoreError::UnknownUsername(username.to_string()))
    }

    fn create(&self, account: Account) -> Result<(), StoreError> {
        let mut accounts = self.inner.write().map_err(poisoned)?;
        // uniqueness check and insert under one write guard
        for existing in accounts.values() {
            if existing.username == account.username {
                return Err(StoreError::Duplicate {
                    field: "username",
                    value: account.username,
                });
            }
            if existing.email == account.email {
                return Err(StoreError::Duplicate {
                    field: "email",
                    value: account.email,
                });
            }
        }
        accounts.insert(account.id, account);
        Ok(())
    }

    fn update_balance(&self, id: AccountId, balance: Amount) -> Result<(), StoreError> {
        let mut accounts = self.inner.write().map_err(poisoned)?;
        let account = accounts.get_mut(&id).ok_or(StoreError::AccountNotFound(id))?;
        account.balance = balance;
        Ok(())
    }

    fn update_status(&self, id: AccountId, status: AccountStatus) -> Result<(), StoreError> {
        let mut accounts = self.inner.write().map_err(poisoned)?;
        let account = accounts.get_mut(&id).ok_or(StoreError::AccountNotFound(id))?;
        account.status = status;
        Ok(())
    }

    fn record_login(&self, id: AccountId, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut accounts = self.inner.write().map_err(poisoned)?;
        let account = accounts.get_mut(&id).ok_or(StoreError::AccountNotFound(id))?;
        account.last_login = Some(at);
        Ok(())
    }

    fn delete(&self, id: AccountId) -> Result<(), StoreError> {
        let mut accounts = self.inner.write().map_err(poisoned)?;
        accounts
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::AccountNotFound(id))
    }

    fn list(&self) -> Result<Vec<Account>, StoreError> {
        let accounts = self.inner.read().map_err(poisoned)?;
        let mut all: Vec<Account> = accounts.values().cloned().collect();
        all.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(all)
    }
}

/// Transaction records keyed by id.
#[derive(Default)]
pub struct MemoryLedger {
    inner: RwLock<HashMap<TxId, Transaction>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sort_newest_first(txs: &mut [Transaction]) {
    // listing order follows the (possibly caller-supplied) timestamp, not
    // commit order; ties broken by id for a stable output
    txs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(a.id.cmp(&b.id)));
}

impl TransactionLedger for MemoryLedger {
    fn get(&self, id: TxId) -> Result<Transaction, StoreError> {
        let txs = self.inner.read().map_err(poisoned)?;
        txs.get(&id).cloned().ok_or(StoreError::TxNotFound(id))
    }

    fn insert(&self, tx: Transaction) -> Result<(), StoreError> {
        let mut txs = self.inner.write().map_err(poisoned)?;
        txs.insert(tx.id, tx);
        Ok(())
    }

    fn delete(&self, id: TxId) -> Result<(), StoreError> {
        let mut txs = self.inner.write().map_err(poisoned)?;
        txs.remove(&id).map(|_| ()).ok_or(StoreError::TxNotFound(id))
    }

    fn delete_by_account(&self, account_id: AccountId) -> Result<usize, StoreError> {
        let mut txs = self.inner.write().map_err(poisoned)?;
        let before = txs.len();
        txs.retain(|_, tx| tx.account_id != account_id);
        Ok(before - txs.len())
    }

    fn list_by_account(
        &self,
        account_id: AccountId,
        limit: Option<usize>,
    ) -> Result<Vec<Transaction>, StoreError> {
        let txs = self.inner.read().map_err(poisoned)?;
        let mut owned: Vec<Transaction> = txs
            .values()
            .filter(|tx| tx.account_id == account_id)
            .cloned()
            .collect();
        sort_newest_first(&mut owned);
        if let Some(limit) = limit {
            owned.truncate(limit);
        }
        Ok(owned)
    }

    fn list_all(&self) -> Result<Vec<Transaction>, StoreError> {
        let txs = self.inner.read().map_err(poisoned)?;
        let mut all: Vec<Transaction> = txs.values().cloned().collect();
        sort_newest_first(&mut all);
        Ok(all)
    }
}

/// Singleton settings record, created with defaults on first read.
#[derive(Default)]
pub struct MemorySettings {
    inner: RwLock<Option<Settings>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self) -> Result<Settings, StoreError> {
        if let Some(settings) = *self.inner.read().map_err(poisoned)? {
            return Ok(settings);
        }
        let mut slot = self.inner.write().map_err(poisoned)?;
        // another writer may have materialized the row in between
        Ok(*slot.get_or_insert_with(Settings::default))
    }

    fn put(&self, settings: Settings) -> Result<(), StoreError> {
        *self.inner.write().map_err(poisoned)? = Some(settings);
        Ok(())
    }
}

/// Append-only audit log.
#[derive(Default)]
pub struct MemoryAudit {
    inner: RwLock<Vec<AuditEntry>>,
}

impl MemoryAudit {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditRecorder for MemoryAudit {
    fn append(&self, entry: AuditEntry) -> Result<(), StoreError> {
        self.inner.write().map_err(poisoned)?.push(entry);
        Ok(())
    }

    fn entries(&self) -> Result<Vec<AuditEntry>, StoreError> {
        Ok(self.inner.read().map_err(poisoned)?.clone())
    }
}
