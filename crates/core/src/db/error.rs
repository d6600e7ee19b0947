use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("db error: {0}")]
    Internal(String),

    #[error("store has been closed")]
    Closed,

    #[error("failed to encode account state: {0}")]
    Encoding(String),
}

impl From<serde_json::Error> for DbError {
    fn from(e: serde_json::Error) -> Self {
        Self::Encoding(e.to_string())
    }
}
