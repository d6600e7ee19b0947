pub mod db;
pub mod error;
mod fund;
mod seesaw_subcommand;
mod spam;

use crate::error::CliError;
use clap::Parser;

pub use fund::{balance, fund};
pub use seesaw_subcommand::{DbCommand, SeesawSubcommand, StoreArgs};
pub use spam::{spam, SpamCliArgs};

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Parser, Debug)]
#[command(
    name = "seesaw",
    version,
    about = "Moves two accounts' funds back and forth, one unit transfer at a time."
)]
pub struct SeesawCli {
    #[command(subcommand)]
    pub command: SeesawSubcommand,
}

impl SeesawCli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
