//! Error types for the banking engine.

use std::time::Duration;
use thiserror::Error;

use crate::Amount;
use crate::model::{AccountId, TxId};
use crate::store::StoreError;

/// Terminal error for a single engine operation.
///
/// Policy failures are deterministic and detected before any write; the
/// engine never retries them. Only [`EngineError::Contention`] is worth a
/// caller-side retry.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("account {0} not found")]
    AccountNotFound(AccountId),

    #[error("transaction {0} not found")]
    TxNotFound(TxId),

    #[error("{field} '{value}' is already taken")]
    AlreadyExists { field: &'static str, value: String },

    #[error("insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: Amount, requested: Amount },

    #[error("balance {resulting} would fall below the minimum balance of {minimum}")]
    BelowMinimumBalance { minimum: Amount, resulting: Amount },

    #[error("amount {amount} exceeds the transaction limit of {limit}")]
    LimitExceeded { amount: Amount, limit: Amount },

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("account {0} is inactive")]
    InactiveAccount(AccountId),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("could not acquire the account lock within {0:?}")]
    Contention(Duration),

    #[error("storage failure: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AccountNotFound(id) => EngineError::AccountNotFound(id),
            StoreError::TxNotFound(id) => EngineError::TxNotFound(id),
            StoreError::Duplicate { field, value } => EngineError::AlreadyExists { field, value },
            other => EngineError::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn store_not_found_maps_to_engine_not_found() {
        let id = Uuid::new_v4();
        let err: EngineError = StoreError::AccountNotFound(id).into();
        assert!(matches!(err, EngineError::AccountNotFound(mapped) if mapped == id));

        let tx = Uuid::new_v4();
        let err: EngineError = StoreError::TxNotFound(tx).into();
        assert!(matches!(err, EngineError::TxNotFound(mapped) if mapped == tx));
    }

    #[test]
    fn store_duplicate_maps_to_already_exists() {
        let err: EngineError = StoreError::Duplicate {
            field: "username",
            value: "alice".to_string(),
        }
        .into();
        assert!(matches!(
            err,
            EngineError::AlreadyExists {
                field: "username",
                ..
            }
        ));
    }

    #[test]
    fn other_store_errors_stay_storage() {
        let err: EngineError = StoreError::Unavailable("disk on fire".to_string()).into();
        assert!(matches!(err, EngineError::Storage(_)));
    }
}
