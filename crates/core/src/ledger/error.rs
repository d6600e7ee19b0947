use super::{AccountId, Address};
use crate::db::DbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("account {0} has not been started")]
    AccountNotStarted(AccountId),

    #[error("account {0} is already started")]
    AccountAlreadyStarted(AccountId),

    #[error("deposit address {0} has expired")]
    AddressExpired(Address),

    #[error("deposit address {0} does not accept further deposits")]
    AddressFulfilled(Address),

    #[error("bundle contains no transfers")]
    EmptyBundle,

    #[error("insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: u64, required: u64 },

    #[error("transfer to {0} has zero value")]
    ZeroValue(Address),

    #[error("ledger state lock poisoned")]
    Poisoned,

    #[error("send rejected: {0}")]
    Rejected(String),

    #[error("account store error: {0}")]
    Store(#[from] DbError),

    #[error("time source error: {0}")]
    TimeSource(String),

    #[error("unknown deposit address {0}")]
    UnknownAddress(Address),

    #[error("transfer value overflows")]
    ValueOverflow,
}
