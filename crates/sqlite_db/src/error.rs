use seesaw_core::db::DbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("error from db connection pool: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("failed to execute query: {0}")]
    ExecuteQuery(#[from] rusqlite::Error),

    #[error("store has been closed")]
    Closed,

    #[error("stored account state is invalid: {0}")]
    InvalidState(#[from] DbError),
}

impl From<Error> for seesaw_core::Error {
    fn from(e: Error) -> Self {
        Self::Db(e.into())
    }
}

impl From<Error> for DbError {
    fn from(value: Error) -> Self {
        use Error::*;
        match value {
            Pool(e) => DbError::Internal(format!("db connection pool encountered an error: {e}")),
            ExecuteQuery(e) => DbError::Internal(format!("failed to execute query: {e}")),
            Closed => DbError::Closed,
            InvalidState(e) => e,
        }
    }
}
