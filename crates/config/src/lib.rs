mod error;
mod spam_config;

pub use error::Error;
pub use spam_config::{SpamConfig, DEFAULT_DB_PATH, DEFAULT_SEEDS};

pub type Result<T> = std::result::Result<T, Error>;
