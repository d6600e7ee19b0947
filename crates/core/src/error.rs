use crate::{db::DbError, ledger::AccountId, ledger::LedgerError, spammer::SyncError};
use chrono::TimeDelta;
use thiserror::Error;
use tokio::task::JoinError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error")]
    Db(#[from] DbError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("runtime error")]
    Runtime(#[from] RuntimeErrorKind),

    /// A unit transfer submission was rejected by the ledger.
    /// Kept apart from [`Error::Ledger`] so callers can report it with the send-failure line.
    #[error("{0}")]
    Send(LedgerError),

    #[error("confirmation synchronizer error")]
    Sync(#[from] SyncError),
}

#[derive(Debug, Error)]
pub enum RuntimeErrorKind {
    #[error("notification stream for account {0} was already taken")]
    EventsTaken(AccountId),

    #[error("deposit timeout of {0} runs past the last representable date")]
    DepositTimeoutOutOfRange(TimeDelta),

    #[error("relay task failed to join: {0}")]
    RelayJoin(#[from] JoinError),

    #[error("sender and receiver must be different accounts, both are {0}")]
    SameAccount(AccountId),
}

impl Error {
    pub fn is_send(&self) -> bool {
        matches!(self, Error::Send(_))
    }
}
