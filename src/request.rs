//! Strongly-typed operation intents, validated at the boundary.
//!
//! The (out of scope) API layer turns loose request bodies into these types
//! before anything reaches the engine; malformed input fails here with
//! [`EngineError::InvalidValue`] and never causes a write.

use chrono::{DateTime, Utc};

use crate::Amount;
use crate::engine::EngineError;
use crate::model::{AccountId, TxKind};

/// Intent to apply one transaction to an account.
#[derive(Debug, Clone)]
pub struct TxRequest {
    pub account_id: AccountId,
    pub kind: TxKind,
    pub amount: Amount,
    pub description: Option<String>,
    /// Caller-supplied timestamp; the engine uses the commit time when absent.
    pub timestamp: Option<DateTime<Utc>>,
    pub recipient_details: Option<serde_json::Value>,
}

impl TxRequest {
    pub fn new(account_id: AccountId, kind: TxKind, amount: Amount) -> Result<Self, EngineError> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidValue(format!(
                "transaction amount must be positive, got {amount}"
            )));
        }
        Ok(Self {
            account_id,
            kind,
            amount,
            description: None,
            timestamp: None,
            recipient_details: None,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_recipient_details(mut self, details: serde_json::Value) -> Self {
        self.recipient_details = Some(details);
        self
    }
}

/// Intent to create an account.
#[derive(Debug, Clone)]
pub struct CreateAccountRequest {
    pub full_name: String,
    pub username: String,
    pub email: String,
    /// Raw secret; hashed by the engine before it is stored anywhere.
    pub password: String,
    pub phone: Option<String>,
    /// Opening balance; the engine applies its default when absent.
    pub initial_balance: Option<Amount>,
    pub is_admin: bool,
}

impl CreateAccountRequest {
    pub fn new(
        full_name: impl Into<String>,
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, EngineError> {
        let full_name = full_name.into();
        let username = username.into();
        let email = email.into();
        let password = password.into();

        for (field, value) in [
            ("full_name", &full_name),
            ("username", &username),
            ("email", &email),
            ("password", &password),
        ] {
            if value.trim().is_empty() {
                return Err(EngineError::InvalidValue(format!(
                    "{field} must not be empty"
                )));
            }
        }

        Ok(Self {
            full_name,
            username,
            email,
            password,
            phone: None,
            initial_balance: None,
            is_admin: false,
        })
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_initial_balance(mut self, balance: Amount) -> Result<Self, EngineError> {
        if balance.is_negative() {
            return Err(EngineError::InvalidValue(format!(
                "initial balance must not be negative, got {balance}"
            )));
        }
        self.initial_balance = Some(balance);
        Ok(self)
    }

    pub fn as_admin(mut self) -> Self {
        self.is_admin = true;
        self
    }
}

/// Partial update of the settings record; unset fields keep their value.
/// The write itself is all-or-nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct SettingsUpdate {
    pub minimum_balance: Option<Amount>,
    pub max_transaction_limit: Option<Amount>,
    pub daily_transaction_limit: Option<Amount>,
    pub transaction_fee: Option<Amount>,
}

impl SettingsUpdate {
    pub fn validate(&self) -> Result<(), EngineError> {
        for (field, value) in [
            ("minimum_balance", self.minimum_balance),
            ("max_transaction_limit", self.max_transaction_limit),
            ("daily_transaction_limit", self.daily_transaction_limit),
            ("transaction_fee", self.transaction_fee),
        ] {
            if let Some(value) = value {
                if value.is_negative() {
                    return Err(EngineError::InvalidValue(format!(
                        "{field} must not be negative, got {value}"
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.minimum_balance.is_none()
            && self.max_transaction_limit.is_none()
            && self.daily_transaction_limit.is_none()
            && self.transaction_fee.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn tx_request_rejects_zero_amount() {
        let result = TxRequest::new(Uuid::new_v4(), TxKind::Deposit, Amount::ZERO);
        assert!(matches!(result, Err(EngineError::InvalidValue(_))));
    }

    #[test]
    fn tx_request_rejects_negative_amount() {
        let result = TxRequest::new(Uuid::new_v4(), TxKind::Withdrawal, Amount::from_float(-5.0));
        assert!(matches!(result, Err(EngineError::InvalidValue(_))));
    }

    #[test]
    fn tx_request_carries_optional_fields() {
        let req = TxRequest::new(Uuid::new_v4(), TxKind::Transfer, Amount::from_float(25.0))
            .unwrap()
            .with_description("rent")
            .with_recipient_details(serde_json::json!({"iban": "DE00"}));
        assert_eq!(req.description.as_deref(), Some("rent"));
        assert!(req.recipient_details.is_some());
        assert!(req.timestamp.is_none());
    }

    #[test]
    fn create_account_rejects_blank_fields() {
        let result = CreateAccountRequest::new("Alice", "", "alice@example.com", "pw");
        assert!(matches!(result, Err(EngineError::InvalidValue(_))));

        let result = CreateAccountRequest::new("Alice", "alice", "alice@example.com", "  ");
        assert!(matches!(result, Err(EngineError::InvalidValue(_))));
    }

    #[test]
    fn create_account_rejects_negative_opening_balance() {
        let result = CreateAccountRequest::new("Alice", "alice", "alice@example.com", "pw")
            .unwrap()
            .with_initial_balance(Amount::from_float(-1.0));
        assert!(matches!(result, Err(EngineError::InvalidValue(_))));
    }

    #[test]
    fn settings_update_rejects_negative_values() {
        let update = SettingsUpdate {
            minimum_balance: Some(Amount::from_float(-10.0)),
            ..SettingsUpdate::default()
        };
        assert!(matches!(
            update.validate(),
            Err(EngineError::InvalidValue(_))
        ));
    }

    #[test]
    fn settings_update_accepts_zero() {
        let update = SettingsUpdate {
            minimum_balance: Some(Amount::ZERO),
            transaction_fee: Some(Amount::ZERO),
            ..SettingsUpdate::default()
        };
        assert!(update.validate().is_ok());
        assert!(!update.is_empty());
    }
}
