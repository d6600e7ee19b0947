mod error;
mod mock;

pub use error::DbError;
pub use mock::MockStore;

use crate::ledger::AccountId;
use serde::{Deserialize, Serialize};

/// Account-internal state persisted between runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    /// Confirmed balance.
    pub balance: u64,
}

impl AccountState {
    pub fn encode(&self) -> Result<String, DbError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(raw: &str) -> Result<Self, DbError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Key-value store of [`AccountState`], keyed by account identity.
/// A single instance is shared by every account of a ledger.
pub trait AccountStore: Send + Sync {
    fn load_state(&self, account: &AccountId) -> Result<Option<AccountState>, DbError>;

    fn save_state(&self, account: &AccountId, state: &AccountState) -> Result<(), DbError>;

    /// Closes the store. Every later operation fails with [`DbError::Closed`].
    fn close(&self) -> Result<(), DbError>;

    fn is_closed(&self) -> bool;
}
