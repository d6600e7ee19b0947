pub mod db;
pub mod error;
pub mod ledger;
pub mod spammer;

pub type Result<T> = std::result::Result<T, error::Error>;
pub use error::Error;
