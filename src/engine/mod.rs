//! Balance mutation engine.
//!
//! The engine is the single authority for turning a transaction intent into
//! a committed (transaction record, balance update) pair, for reversing a
//! committed transaction, and for the administrative account and settings
//! operations. It holds no persistent state of its own: records live behind
//! the store traits, and the engine keeps only the per-account locks that
//! serialize each read-check-write sequence.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio_stream::{Stream, StreamExt};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::Amount;
use crate::model::{
    Account, AccountId, AccountStatus, Actor, AuditEntry, LedgerEntry, Receipt, Settings,
    Transaction, TxId,
};
use crate::request::{CreateAccountRequest, SettingsUpdate, TxRequest};
use crate::store::{
    AccountStore, AuditRecorder, MemoryAccounts, MemoryAudit, MemoryLedger, MemorySettings,
    SettingsStore, StoreError, TransactionLedger,
};

mod error;
pub use error::EngineError;

/// Opening balance for accounts created without an explicit one.
const DEFAULT_OPENING_BALANCE: Amount = Amount::from_scaled(10_000);

/// How long a caller may wait on a contended account before giving up.
const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(5);

/// The banking engine.
///
/// Safe to share across concurrent callers; wrap it in an [`Arc`] and call
/// methods through `&self`.
pub struct Engine {
    accounts: Arc<dyn AccountStore>,
    ledger: Arc<dyn TransactionLedger>,
    settings: Arc<dyn SettingsStore>,
    audit: Arc<dyn AuditRecorder>,
    /// One mutex per account, held for the whole read-check-write sequence.
    locks: StdMutex<HashMap<AccountId, Arc<AsyncMutex<()>>>>,
    /// Serializes read-modify-write settings updates.
    settings_write: AsyncMutex<()>,
    lock_wait: Duration,
}

/// Public API
impl Engine {
    /// Engine backed by fresh in-memory stores.
    pub fn new() -> Self {
        Self::with_stores(
            Arc::new(MemoryAccounts::new()),
            Arc::new(MemoryLedger::new()),
            Arc::new(MemorySettings::new()),
            Arc::new(MemoryAudit::new()),
        )
    }

    /// Engine over caller-supplied storage backends.
    pub fn with_stores(
        accounts: Arc<dyn AccountStore>,
        ledger: Arc<dyn TransactionLedger>,
        settings: Arc<dyn SettingsStore>,
        audit: Arc<dyn AuditRecorder>,
    ) -> Self {
        Self {
            accounts,
            ledger,
            settings,
            audit,
            locks: StdMutex::new(HashMap::new()),
            settings_write: AsyncMutex::new(()),
            lock_wait: DEFAULT_LOCK_WAIT,
        }
    }

    /// Override the bounded lock wait (mostly useful in tests).
    pub fn with_lock_wait(mut self, wait: Duration) -> Self {
        self.lock_wait = wait;
        self
    }

    /// Apply a transaction intent: validate policy against the
    /// pre-transaction balance, then commit the record and the new balance
    /// as one unit.
    ///
    /// Policy order follows the source system: the per-transaction ceiling
    /// is checked for every kind, the balance checks only for debit kinds.
    pub async fn apply_transaction(
        &self,
        actor: &Actor,
        req: TxRequest,
    ) -> Result<Receipt, EngineError> {
        let _guard = self.lock_account(req.account_id).await?;

        let account = self.accounts.get(req.account_id)?;
        if account.status != AccountStatus::Active {
            return Err(EngineError::InactiveAccount(account.id));
        }
        let settings = self.settings.get()?;

        if req.amount > settings.max_transaction_limit {
            return Err(EngineError::LimitExceeded {
                amount: req.amount,
                limit: settings.max_transaction_limit,
            });
        }
        let new_balance = if req.kind.is_debit() {
            if account.balance < req.amount {
                return Err(EngineError::InsufficientFunds {
                    balance: account.balance,
                    requested: req.amount,
                });
            }
            let resulting = account.balance - req.amount;
            if resulting < settings.minimum_balance {
                return Err(EngineError::BelowMinimumBalance {
                    minimum: settings.minimum_balance,
                    resulting,
                });
            }
            resulting
        } else {
            account.balance + req.amount
        };

        let tx = Transaction {
            id: Uuid::new_v4(),
            account_id: account.id,
            kind: req.kind,
            amount: req.amount,
            description: req.description,
            timestamp: req.timestamp.unwrap_or_else(Utc::now),
            recipient_details: req.recipient_details,
        };

        self.ledger.insert(tx.clone())?;
        if let Err(e) = self.accounts.update_balance(account.id, new_balance) {
            // never leave a record without its balance effect
            if let Err(undo) = self.ledger.delete(tx.id) {
                error!(tx = %tx.id, error = %undo, "rollback failed; ledger and balance disagree");
            }
            return Err(e.into());
        }

        info!(
            account = %account.id,
            tx = %tx.id,
            kind = %tx.kind,
            amount = %tx.amount,
            balance = %new_balance,
            "transaction applied"
        );

        if actor.admin {
            self.record_audit(
                actor,
                "transaction.created",
                json!({
                    "account_id": account.id,
                    "type": tx.kind.as_str(),
                    "amount": tx.amount.to_string(),
                    "new_balance": new_balance.to_string(),
                }),
            );
        }

        Ok(Receipt {
            transaction: tx,
            balance: new_balance,
        })
    }

    /// Reverse a committed transaction: apply the inverse balance delta and
    /// delete the record as one unit.
    ///
    /// A reversal is a corrective action, not a new transaction, so neither
    /// the transaction limit nor the minimum balance is re-checked.
    pub async fn reverse_transaction(&self, actor: &Actor, id: TxId) -> Result<(), EngineError> {
        // resolve the owner first; the lock must be held before re-reading
        let owner = self.ledger.get(id)?.account_id;
        let _guard = self.lock_account(owner).await?;

        // the record may have been reversed while we waited for the lock
        let tx = self.ledger.get(id)?;
        let account = self.accounts.get(tx.account_id)?;

        let restored = if tx.kind.is_debit() {
            account.balance + tx.amount
        } else {
            account.balance - tx.amount
        };

        self.accounts.update_balance(account.id, restored)?;
        if let Err(e) = self.ledger.delete(tx.id) {
            if let Err(undo) = self.accounts.update_balance(account.id, account.balance) {
                error!(
                    account = %account.id,
                    error = %undo,
                    "rollback failed; ledger and balance disagree"
                );
            }
            return Err(e.into());
        }

        info!(
            account = %account.id,
            tx = %tx.id,
            kind = %tx.kind,
            amount = %tx.amount,
            balance = %restored,
            "transaction reversed"
        );

        self.record_audit(
            actor,
            "transaction.reversed",
            json!({
                "account_id": account.id,
                "transaction_id": tx.id,
                "type": tx.kind.as_str(),
                "amount": tx.amount.to_string(),
                "new_balance": restored.to_string(),
            }),
        );

        Ok(())
    }

    /// Transactions for one account, newest first, bounded by `limit`.
    pub fn list_transactions(
        &self,
        account_id: AccountId,
        limit: Option<usize>,
    ) -> Result<Vec<Transaction>, EngineError> {
        Ok(self.ledger.list_by_account(account_id, limit)?)
    }

    /// Every transaction joined with its owning username, newest first.
    pub fn list_all_transactions(&self) -> Result<Vec<LedgerEntry>, EngineError> {
        let usernames: HashMap<AccountId, String> = self
            .accounts
            .list()?
            .into_iter()
            .map(|a| (a.id, a.username))
            .collect();

        let mut entries = Vec::new();
        for tx in self.ledger.list_all()? {
            match usernames.get(&tx.account_id) {
                Some(username) => entries.push(LedgerEntry {
                    username: username.clone(),
                    transaction: tx,
                }),
                None => warn!(
                    tx = %tx.id,
                    account = %tx.account_id,
                    "ledger row without owning account"
                ),
            }
        }
        Ok(entries)
    }

    pub fn get_account(&self, id: AccountId) -> Result<Account, EngineError> {
        Ok(self.accounts.get(id)?)
    }

    /// All accounts ordered by username.
    pub fn list_accounts(&self) -> Result<Vec<Account>, EngineError> {
        Ok(self.accounts.list()?)
    }

    /// Create an account. Fails with [`EngineError::AlreadyExists`] when the
    /// username or email collides.
    pub fn create_account(
        &self,
        actor: &Actor,
        req: CreateAccountRequest,
    ) -> Result<Account, EngineError> {
        let account = Account::new(
            req.full_name,
            req.username,
            req.email,
            Account::hash_password(&req.password),
            req.phone,
            req.initial_balance.unwrap_or(DEFAULT_OPENING_BALANCE),
            req.is_admin,
        );
        self.accounts.create(account.clone())?;

        info!(account = %account.id, username = %account.username, "account created");

        if actor.admin {
            self.record_audit(
                actor,
                "account.created",
                json!({
                    "account_id": account.id,
                    "username": account.username,
                    "balance": account.balance.to_string(),
                }),
            );
        }
        Ok(account)
    }

    pub fn update_account_status(
        &self,
        actor: &Actor,
        id: AccountId,
        status: AccountStatus,
    ) -> Result<Account, EngineError> {
        self.accounts.update_status(id, status)?;
        let account = self.accounts.get(id)?;

        info!(account = %id, status = %status, "account status updated");

        if actor.admin {
            self.record_audit(
                actor,
                "account.status_updated",
                json!({ "account_id": id, "status": status.as_str() }),
            );
        }
        Ok(account)
    }

    /// Direct admin balance override. Bypasses every policy check; the only
    /// validation is that the balance is not negative.
    pub async fn update_account_balance(
        &self,
        actor: &Actor,
        id: AccountId,
        balance: Amount,
    ) -> Result<Account, EngineError> {
        if balance.is_negative() {
            return Err(EngineError::InvalidValue(format!(
                "balance must not be negative, got {balance}"
            )));
        }

        let _guard = self.lock_account(id).await?;
        self.accounts.update_balance(id, balance)?;
        let account = self.accounts.get(id)?;

        info!(account = %id, balance = %balance, "balance overridden");

        if actor.admin {
            self.record_audit(
                actor,
                "account.balance_overridden",
                json!({ "account_id": id, "balance": balance.to_string() }),
            );
        }
        Ok(account)
    }

    /// Delete an account and every transaction it owns. Destructive: the
    /// cascade removes the ledger rows, it does not reverse them.
    pub async fn delete_account(&self, actor: &Actor, id: AccountId) -> Result<(), EngineError> {
        let guard = self.lock_account(id).await?;
        let account = self.accounts.get(id)?;

        let removed = self.ledger.delete_by_account(id)?;
        self.accounts.delete(id)?;

        drop(guard);
        self.forget_lock(id);

        info!(account = %id, removed, "account deleted");

        if actor.admin {
            self.record_audit(
                actor,
                "account.deleted",
                json!({
                    "account_id": id,
                    "username": account.username,
                    "transactions_removed": removed,
                }),
            );
        }
        Ok(())
    }

    pub fn get_settings(&self) -> Result<Settings, EngineError> {
        Ok(self.settings.get()?)
    }

    /// Apply a settings patch as one whole-record replacement.
    pub async fn update_settings(
        &self,
        actor: &Actor,
        update: SettingsUpdate,
    ) -> Result<Settings, EngineError> {
        update.validate()?;
        if update.is_empty() {
            return self.get_settings();
        }

        let _guard = tokio::time::timeout(self.lock_wait, self.settings_write.lock())
            .await
            .map_err(|_| EngineError::Contention(self.lock_wait))?;

        let mut settings = self.settings.get()?;
        if let Some(v) = update.minimum_balance {
            settings.minimum_balance = v;
        }
        if let Some(v) = update.max_transaction_limit {
            settings.max_transaction_limit = v;
        }
        if let Some(v) = update.daily_transaction_limit {
            settings.daily_transaction_limit = v;
        }
        if let Some(v) = update.transaction_fee {
            settings.transaction_fee = v;
        }
        self.settings.put(settings)?;

        info!(
            minimum_balance = %settings.minimum_balance,
            max_transaction_limit = %settings.max_transaction_limit,
            "settings updated"
        );

        if actor.admin {
            self.record_audit(
                actor,
                "settings.updated",
                json!({
                    "minimum_balance": settings.minimum_balance.to_string(),
                    "max_transaction_limit": settings.max_transaction_limit.to_string(),
                    "daily_transaction_limit": settings.daily_transaction_limit.to_string(),
                    "transaction_fee": settings.transaction_fee.to_string(),
                }),
            );
        }
        Ok(settings)
    }

    /// Check a username/password pair and record the login time.
    ///
    /// Unknown usernames and wrong passwords are indistinguishable to the
    /// caller.
    pub fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Account, EngineError> {
        let account = match self.accounts.get_by_username(username) {
            Ok(account) => account,
            Err(StoreError::UnknownUsername(_)) => return Err(EngineError::InvalidCredentials),
            Err(e) => return Err(e.into()),
        };
        if !account.verify_password(password) {
            return Err(EngineError::InvalidCredentials);
        }

        let now = Utc::now();
        self.accounts.record_login(account.id, now)?;

        info!(account = %account.id, username = %account.username, "login verified");

        if account.is_admin {
            self.record_audit(
                &Actor::admin(account.id),
                "auth.login",
                json!({ "username": account.username }),
            );
        }

        Ok(Account {
            last_login: Some(now),
            ..account
        })
    }

    /// The audit log, oldest first.
    pub fn audit_log(&self) -> Result<Vec<AuditEntry>, EngineError> {
        Ok(self.audit.entries()?)
    }

    /// Drive the engine from a stream of intents on behalf of one actor.
    /// A rejected intent is logged and skipped, never fatal.
    pub async fn run(&self, actor: &Actor, mut stream: impl Stream<Item = TxRequest> + Unpin) {
        while let Some(req) = stream.next().await {
            let account = req.account_id;
            if let Err(e) = self.apply_transaction(actor, req).await {
                warn!(account = %account, reason = %e, "transaction skipped");
            }
        }
    }
}

/// Private API
impl Engine {
    /// Acquire the per-account mutex with a bounded wait.
    async fn lock_account(&self, id: AccountId) -> Result<OwnedMutexGuard<()>, EngineError> {
        let lock = {
            let mut locks = self.locks.lock().map_err(|_| {
                EngineError::Storage(StoreError::Unavailable(
                    "poisoned lock registry".to_string(),
                ))
            })?;
            Arc::clone(locks.entry(id).or_default())
        };
        tokio::time::timeout(self.lock_wait, lock.lock_owned())
            .await
            .map_err(|_| EngineError::Contention(self.lock_wait))
    }

    fn forget_lock(&self, id: AccountId) {
        if let Ok(mut locks) = self.locks.lock() {
            locks.remove(&id);
        }
    }

    /// Best-effort audit append: a failure here must not fail the mutation
    /// it describes.
    fn record_audit(&self, actor: &Actor, action: &str, details: serde_json::Value) {
        if let Err(e) = self.audit.append(AuditEntry::new(actor.id, action, details)) {
            warn!(action, error = %e, "audit entry dropped");
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
