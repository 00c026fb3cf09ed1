pub mod amount;
pub mod csv;
pub mod engine;
pub mod limiter;
pub mod model;
pub mod request;
pub mod store;

pub use amount::Amount;
pub use engine::{Engine, EngineError};
pub use limiter::RateLimiter;
pub use model::{
    Account, AccountId, AccountStatus, Actor, Receipt, Settings, Transaction, TxId, TxKind,
};
pub use request::{CreateAccountRequest, SettingsUpdate, TxRequest};
