use super::{AccountState, AccountStore, DbError};
use crate::ledger::AccountId;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
};

/// In-memory [`AccountStore`].
#[derive(Debug, Default)]
pub struct MockStore {
    states: Mutex<HashMap<AccountId, AccountState>>,
    closed: AtomicBool,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self) -> Result<(), DbError> {
        if self.is_closed() {
            return Err(DbError::Closed);
        }
        Ok(())
    }
}

impl AccountStore for MockStore {
    fn load_state(&self, account: &AccountId) -> Result<Option<AccountState>, DbError> {
        self.ensure_open()?;
        let states = self
            .states
            .lock()
            .map_err(|e| DbError::Internal(e.to_string()))?;
        Ok(states.get(account).copied())
    }

    fn save_state(&self, account: &AccountId, state: &AccountState) -> Result<(), DbError> {
        self.ensure_open()?;
        self.states
            .lock()
            .map_err(|e| DbError::Internal(e.to_string()))?
            .insert(account.to_owned(), *state);
        Ok(())
    }

    fn close(&self) -> Result<(), DbError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_store_rejects_operations() {
        let id = AccountId::new("A");
        let store = MockStore::new();
        store.save_state(&id, &AccountState { balance: 3 }).unwrap();
        assert_eq!(store.load_state(&id).unwrap(), Some(AccountState { balance: 3 }));

        store.close().unwrap();
        assert!(store.is_closed());
        assert!(matches!(store.load_state(&id), Err(DbError::Closed)));
        assert!(matches!(
            store.save_state(&id, &AccountState::default()),
            Err(DbError::Closed)
        ));
    }
}
