mod db;
mod error;

/// Increment this whenever making changes to the DB schema.
pub static DB_VERSION: u64 = 1;

pub use db::*;
pub use error::Error;

pub type Result<T> = std::result::Result<T, Error>;
