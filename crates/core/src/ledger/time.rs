use super::LedgerError;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Mutex;

/// Supplies the reference time used for deposit-address expiry.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Result<DateTime<Utc>, LedgerError>;
}

/// Reads the local system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Result<DateTime<Utc>, LedgerError> {
        Ok(Utc::now())
    }
}

/// Manually driven clock.
#[derive(Debug)]
pub struct FixedTimeSource {
    now: Mutex<DateTime<Utc>>,
}

impl FixedTimeSource {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: TimeDelta) -> Result<(), LedgerError> {
        let mut now = self
            .now
            .lock()
            .map_err(|e| LedgerError::TimeSource(e.to_string()))?;
        *now += by;
        Ok(())
    }
}

impl TimeSource for FixedTimeSource {
    fn now(&self) -> Result<DateTime<Utc>, LedgerError> {
        self.now
            .lock()
            .map(|now| *now)
            .map_err(|e| LedgerError::TimeSource(e.to_string()))
    }
}
