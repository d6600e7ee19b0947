use crate::{Error, Result};
use chrono::{TimeDelta, Utc};
use seesaw_core::{
    ledger::sim::{SimLedgerConfig, DEFAULT_CONFIRMATION_DELAY},
    spammer::{SessionParams, DEFAULT_DEPOSIT_TIMEOUT_HOURS, DEFAULT_POLL_INTERVAL},
};
use serde::{Deserialize, Serialize};
use std::{fs::read, str::FromStr, time::Duration};

pub const DEFAULT_DB_PATH: &str = "seesaw.db";

pub const DEFAULT_SEEDS: [&str; 2] = [
    "SEESAW9ACCOUNT9ONE9DEFAULT9SEED",
    "SEESAW9ACCOUNT9TWO9DEFAULT9SEED",
];

/// Settings of a spam run. Defines the TOML schema of config files;
/// every field may be omitted.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SpamConfig {
    /// SQLite file holding both accounts' state.
    pub db_path: String,

    /// Seeds of account 1 and account 2, in that order.
    pub seeds: Vec<String>,

    /// Lifetime of deposit addresses, counted from start.
    pub deposit_timeout_hours: u64,

    /// Balance poll interval while waiting for the first deposit.
    pub poll_interval_ms: u64,

    /// Delay before a sent transfer is confirmed.
    pub confirmation_delay_ms: u64,

    /// Reject every send after this many have succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_send_after: Option<u64>,
}

impl Default for SpamConfig {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_owned(),
            seeds: DEFAULT_SEEDS.iter().map(|s| s.to_string()).collect(),
            deposit_timeout_hours: DEFAULT_DEPOSIT_TIMEOUT_HOURS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            confirmation_delay_ms: DEFAULT_CONFIRMATION_DELAY.as_millis() as u64,
            fail_send_after: None,
        }
    }
}

impl FromStr for SpamConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }
}

impl SpamConfig {
    pub fn from_file(file_path: &str) -> Result<Self> {
        let file_contents = String::from_utf8_lossy(&read(file_path)?).to_string();
        file_contents.parse()
    }

    pub fn encode_toml(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    pub fn save_toml(&self, file_path: &str) -> Result<()> {
        std::fs::write(file_path, self.encode_toml()?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let [first, second] = self.seeds.as_slice() else {
            return Err(Error::Invalid(format!(
                "exactly two seeds are required, found {}",
                self.seeds.len()
            )));
        };
        if first.is_empty() || second.is_empty() {
            return Err(Error::Invalid("seeds must not be empty".to_owned()));
        }
        if first == second {
            return Err(Error::Invalid("both accounts use the same seed".to_owned()));
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::Invalid("poll_interval_ms must be non-zero".to_owned()));
        }
        self.deposit_timeout()?;
        Ok(())
    }

    /// Returns the seeds of account 1 and account 2.
    pub fn seed_pair(&self) -> Result<(&str, &str)> {
        self.validate()?;
        Ok((self.seeds[0].as_str(), self.seeds[1].as_str()))
    }

    pub fn deposit_timeout(&self) -> Result<TimeDelta> {
        i64::try_from(self.deposit_timeout_hours)
            .ok()
            .and_then(TimeDelta::try_hours)
            .filter(|timeout| *timeout > TimeDelta::zero())
            .filter(|timeout| Utc::now().checked_add_signed(*timeout).is_some())
            .ok_or_else(|| {
                Error::Invalid(format!(
                    "deposit_timeout_hours out of range: {}",
                    self.deposit_timeout_hours
                ))
            })
    }

    pub fn session_params(&self) -> Result<SessionParams> {
        Ok(SessionParams {
            deposit_timeout: self.deposit_timeout()?,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        })
    }

    pub fn ledger_config(&self) -> SimLedgerConfig {
        SimLedgerConfig {
            confirmation_delay: Duration::from_millis(self.confirmation_delay_ms),
            fail_send_after: self.fail_send_after,
        }
    }
}
