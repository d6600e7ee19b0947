use crate::commands::error::ArgsError;
use miette::Diagnostic;
use seesaw_core::{db::DbError, ledger::LedgerError};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("invalid arg(s)")]
    Args(#[from] ArgsError),

    #[error("config error")]
    Config(#[from] seesaw_config::Error),

    #[error("core error")]
    Core(#[from] seesaw_core::Error),

    #[error("db error")]
    Db(#[from] seesaw_sqlite::Error),

    #[error("invalid DB version: found {found}, expected {expected}")]
    #[diagnostic(help("run `seesaw db reset` to recreate the database"))]
    DbVersion { found: u64, expected: u64 },

    #[error("io error")]
    Io(#[from] std::io::Error),

    #[error("ledger error")]
    Ledger(#[from] LedgerError),

    #[error("account store error")]
    Store(#[from] DbError),
}
