//! Storage traits for the banking core.
//!
//! The engine orchestrates mutations through these traits; it holds no
//! persistent state of its own. The in-memory implementations live in
//! [`memory`]; tests substitute failing wrappers to exercise rollback.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::Amount;
use crate::model::{Account, AccountId, AccountStatus, AuditEntry, Settings, Transaction, TxId};

mod memory;
pub use memory::{MemoryAccounts, MemoryAudit, MemoryLedger, MemorySettings};

/// Error surfaced by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("account {0} not found")]
    AccountNotFound(AccountId),

    #[error("account '{0}' not found")]
    UnknownUsername(String),

    #[error("transaction {0} not found")]
    TxNotFound(TxId),

    #[error("{field} '{value}' is already taken")]
    Duplicate { field: &'static str, value: String },

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Persisted account records.
pub trait AccountStore: Send + Sync {
    fn get(&self, id: AccountId) -> Result<Account, StoreError>;
    fn get_by_username(&self, username: &str) -> Result<Account, StoreError>;
    /// Insert a new account. Fails with [`StoreError::Duplicate`] when the
    /// username or email collides with an existing record.
    fn create(&self, account: Account) -> Result<(), StoreError>;
    fn update_balance(&self, id: AccountId, balance: Amount) -> Result<(), StoreError>;
    fn update_status(&self, id: AccountId, status: AccountStatus) -> Result<(), StoreError>;
    fn record_login(&self, id: AccountId, at: DateTime<Utc>) -> Result<(), StoreError>;
    fn delete(&self, id: AccountId) -> Result<(), StoreError>;
    /// All accounts ordered by username ascending.
    fn list(&self) -> Result<Vec<Account>, StoreError>;
}

/// Append/delete of transaction records, each linked to one account.
pub trait TransactionLedger: Send + Sync {
    fn get(&self, id: TxId) -> Result<Transaction, StoreError>;
    fn insert(&self, tx: Transaction) -> Result<(), StoreError>;
    fn delete(&self, id: TxId) -> Result<(), StoreError>;
    /// Remove every transaction owned by `account_id`, returning the count.
    fn delete_by_account(&self, account_id: AccountId) -> Result<usize, StoreError>;
    /// Transactions for one account, timestamp descending, bounded by `limit`.
    fn list_by_account(
        &self,
        account_id: AccountId,
        limit: Option<usize>,
    ) -> Result<Vec<Transaction>, StoreError>;
    /// All transactions, timestamp descending.
    fn list_all(&self) -> Result<Vec<Transaction>, StoreError>;
}

/// Singleton policy record, materialized with defaults on first read.
pub trait SettingsStore: Send + Sync {
    fn get(&self) -> Result<Settings, StoreError>;
    /// Replace the whole record; readers never observe a partial write.
    fn put(&self, settings: Settings) -> Result<(), StoreError>;
}

/// Append-only log of administrative actions.
pub trait AuditRecorder: Send + Sync {
    fn append(&self, entry: AuditEntry) -> Result<(), StoreError>;
    fn entries(&self) -> Result<Vec<AuditEntry>, StoreError>;
}
