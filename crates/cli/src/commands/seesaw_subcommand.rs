use super::{error::ArgsError, spam::SpamCliArgs, Result};
use clap::{Args, Subcommand};
use seesaw_config::SpamConfig;
use std::path::PathBuf;

#[derive(Debug, Subcommand)]
pub enum SeesawSubcommand {
    #[command(
        name = "spam",
        long_about = "Transfer each account's whole balance to the other, one unit at a time, until interrupted."
    )]
    Spam {
        #[command(flatten)]
        args: Box<SpamCliArgs>,
    },

    #[command(name = "fund", about = "Credit an account's balance")]
    Fund {
        #[command(flatten)]
        store: StoreArgs,

        /// Account to credit.
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=2))]
        account: u8,

        /// Amount to credit.
        #[arg(long)]
        amount: u64,
    },

    #[command(name = "balance", about = "Print both accounts' balances")]
    Balance {
        #[command(flatten)]
        store: StoreArgs,
    },

    #[command(name = "db", about = "Database management commands")]
    Db {
        #[command(flatten)]
        store: StoreArgs,

        #[command(subcommand)]
        command: DbCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum DbCommand {
    #[command(name = "drop", about = "Delete the database file")]
    Drop,

    #[command(name = "reset", about = "Drop and re-initialize the database")]
    Reset,
}

/// Where the accounts live. Flags override the config file.
#[derive(Debug, Clone, Default, Args)]
pub struct StoreArgs {
    /// Path to a TOML config file.
    #[arg(short, long, env = "SEESAW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the SQLite database file.
    #[arg(long = "db", env = "SEESAW_DB")]
    pub db_path: Option<String>,

    /// Account seed; pass twice, account 1 first.
    #[arg(long = "seed", value_name = "SEED", num_args = 1)]
    pub seeds: Vec<String>,
}

impl StoreArgs {
    pub fn resolve_config(&self) -> Result<SpamConfig> {
        let mut config = match &self.config {
            Some(path) => SpamConfig::from_file(&path.to_string_lossy())?,
            None => SpamConfig::default(),
        };
        if let Some(db_path) = &self.db_path {
            config.db_path = db_path.to_owned();
        }
        if !self.seeds.is_empty() {
            if self.seeds.len() != 2 {
                return Err(ArgsError::SeedCount(self.seeds.len()).into());
            }
            config.seeds = self.seeds.clone();
        }
        config.validate()?;
        Ok(config)
    }
}
