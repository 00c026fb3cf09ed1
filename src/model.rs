//! Core domain types for the banking core.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::Amount;

/// Account identifier.
pub type AccountId = Uuid;

/// Transaction identifier.
pub type TxId = Uuid;

/// Kind of balance-affecting transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxKind {
    Deposit,
    Withdrawal,
    Transfer,
    BillPay,
}

impl TxKind {
    /// Debit kinds decrease the balance; only deposits credit it.
    pub fn is_debit(self) -> bool {
        !matches!(self, TxKind::Deposit)
    }

    pub fn parse(value: &str) -> Option<TxKind> {
        match value.to_ascii_lowercase().as_str() {
            "deposit" => Some(TxKind::Deposit),
            "withdrawal" => Some(TxKind::Withdrawal),
            "transfer" => Some(TxKind::Transfer),
            "bill pay" | "bill_pay" | "billpay" => Some(TxKind::BillPay),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TxKind::Deposit => "Deposit",
            TxKind::Withdrawal => "Withdrawal",
            TxKind::Transfer => "Transfer",
            TxKind::BillPay => "Bill Pay",
        }
    }
}

impl std::fmt::Display for TxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an account may create new transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccountStatus {
    #[default]
    Active,
    Inactive,
}

impl AccountStatus {
    pub fn parse(value: &str) -> Option<AccountStatus> {
        match value.to_ascii_lowercase().as_str() {
            "active" => Some(AccountStatus::Active),
            "inactive" => Some(AccountStatus::Inactive),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AccountStatus::Active => "Active",
            AccountStatus::Inactive => "Inactive",
        }
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An account holding a monetary balance.
///
/// The balance is a stored field updated alongside each transaction record,
/// not a sum derived from the ledger.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: AccountId,
    pub full_name: String,
    pub username: String,
    pub email: String,
    /// Salted SHA-256 hash, `<salt>$<hex digest>`. Never the raw secret.
    pub password_hash: String,
    pub phone: Option<String>,
    pub status: AccountStatus,
    pub balance: Amount,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl Account {
    pub fn new(
        full_name: String,
        username: String,
        email: String,
        password_hash: String,
        phone: Option<String>,
        balance: Amount,
        is_admin: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            full_name,
            username,
            email,
            password_hash,
            phone,
            status: AccountStatus::Active,
            balance,
            is_admin,
            created_at: Utc::now(),
            last_login: None,
        }
    }

    /// Hash a raw secret with a fresh random salt.
    pub fn hash_password(password: &str) -> String {
        let salt = Uuid::new_v4().simple().to_string();
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(password.as_bytes());
        format!("{salt}${:x}", hasher.finalize())
    }

    /// Check a raw secret against this account's stored hash.
    pub fn verify_password(&self, password: &str) -> bool {
        let Some((salt, digest)) = self.password_hash.split_once('$') else {
            return false;
        };
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(password.as_bytes());
        format!("{:x}", hasher.finalize()) == digest
    }
}

/// An immutable record of a balance-affecting event.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: TxId,
    pub account_id: AccountId,
    pub kind: TxKind,
    pub amount: Amount,
    pub description: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub recipient_details: Option<serde_json::Value>,
}

/// A committed transaction together with the balance it produced, for caller display.
#[derive(Debug, Clone)]
pub struct Receipt {
    pub transaction: Transaction,
    pub balance: Amount,
}

/// A ledger row joined with the owning account's username, for admin views.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub transaction: Transaction,
    pub username: String,
}

/// Global numeric policy thresholds applied to transaction validation.
///
/// `daily_transaction_limit` and `transaction_fee` are stored policy values
/// that the engine does not currently enforce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub minimum_balance: Amount,
    pub max_transaction_limit: Amount,
    pub daily_transaction_limit: Amount,
    pub transaction_fee: Amount,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            minimum_balance: Amount::from_scaled(10_000),
            max_transaction_limit: Amount::from_scaled(1_000_000),
            daily_transaction_limit: Amount::from_scaled(5_000_000),
            transaction_fee: Amount::from_scaled(100),
        }
    }
}

/// Append-only record of an administrative action.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub id: Uuid,
    pub actor_id: AccountId,
    pub action: String,
    pub details: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(actor_id: AccountId, action: &str, details: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor_id,
            action: action.to_string(),
            details,
            timestamp: Utc::now(),
        }
    }
}

/// Caller-supplied identity context, resolved by the (out of scope) API layer.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub id: AccountId,
    pub admin: bool,
}

impl Actor {
    pub fn user(id: AccountId) -> Self {
        Self { id, admin: false }
    }

    pub fn admin(id: AccountId) -> Self {
        Self { id, admin: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deposit_is_the_only_credit_kind() {
        assert!(!TxKind::Deposit.is_debit());
        assert!(TxKind::Withdrawal.is_debit());
        assert!(TxKind::Transfer.is_debit());
        assert!(TxKind::BillPay.is_debit());
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!(TxKind::parse("deposit"), Some(TxKind::Deposit));
        assert_eq!(TxKind::parse("Withdrawal"), Some(TxKind::Withdrawal));
        assert_eq!(TxKind::parse("bill pay"), Some(TxKind::BillPay));
        assert_eq!(TxKind::parse("bill_pay"), Some(TxKind::BillPay));
        assert_eq!(TxKind::parse("loan"), None);
    }

    #[test]
    fn status_parses_and_displays() {
        assert_eq!(AccountStatus::parse("active"), Some(AccountStatus::Active));
        assert_eq!(
            AccountStatus::parse("Inactive"),
            Some(AccountStatus::Inactive)
        );
        assert_eq!(AccountStatus::parse("frozen"), None);
        assert_eq!(AccountStatus::Active.to_string(), "Active");
    }

    #[test]
    fn settings_defaults_match_seed_values() {
        let settings = Settings::default();
        assert_eq!(settings.minimum_balance, Amount::from_float(100.0));
        assert_eq!(settings.max_transaction_limit, Amount::from_float(10_000.0));
        assert_eq!(
            settings.daily_transaction_limit,
            Amount::from_float(50_000.0)
        );
        assert_eq!(settings.transaction_fee, Amount::from_float(1.0));
    }

    #[test]
    fn password_hash_verifies() {
        let hash = Account::hash_password("hunter2");
        let account = Account::new(
            "Test User".to_string(),
            "test".to_string(),
            "test@example.com".to_string(),
            hash,
            None,
            Amount::ZERO,
            false,
        );
        assert!(account.verify_password("hunter2"));
        assert!(!account.verify_password("hunter3"));
    }

    #[test]
    fn password_hashes_are_salted() {
        assert_ne!(
            Account::hash_password("hunter2"),
            Account::hash_password("hunter2")
        );
    }

    #[test]
    fn malformed_hash_never_verifies() {
        let mut account = Account::new(
            "Test User".to_string(),
            "test".to_string(),
            "test@example.com".to_string(),
            Account::hash_password("hunter2"),
            None,
            Amount::ZERO,
            false,
        );
        account.password_hash = "not-a-hash".to_string();
        assert!(!account.verify_password("hunter2"));
    }

    #[test]
    fn new_account_starts_active() {
        let account = Account::new(
            "Test User".to_string(),
            "test".to_string(),
            "test@example.com".to_string(),
            Account::hash_password("pw"),
            None,
            Amount::from_float(100.0),
            false,
        );
        assert_eq!(account.status, AccountStatus::Active);
        assert!(account.last_login.is_none());
    }
}
