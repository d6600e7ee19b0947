//! Capability interface of a ledger account, as seen by the spammer.
//!
//! The spammer never builds bundles, does proof-of-work or talks to a node itself; it only
//! uses what [`LedgerAccount`] exposes. [`sim`] provides an in-process implementation.
mod error;
pub mod sim;
mod time;
mod trytes;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use tokio::sync::mpsc;

pub use error::LedgerError;
pub use time::{FixedTimeSource, SystemTimeSource, TimeSource};
pub use trytes::{is_trytes, random_trytes, trytes_from_seed, HASH_TRYTES, TRYTE_ALPHABET};

/// Number of characters of an account id shown in batch headers.
pub const SHORT_ID_LEN: usize = 5;

pub type Address = String;

/// Opaque account identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First [`SHORT_ID_LEN`] characters of the id.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(SHORT_ID_LEN) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for AccountId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Conditions under which deposits to a freshly allocated address are accepted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositConditions {
    pub timeout_at: Option<DateTime<Utc>>,
    pub multi_use: bool,
    pub expected_amount: Option<u64>,
}

impl DepositConditions {
    /// Single-use address without an expected amount. Used to ask the operator for funds.
    pub fn single_use(timeout_at: DateTime<Utc>) -> Self {
        Self {
            timeout_at: Some(timeout_at),
            multi_use: false,
            expected_amount: None,
        }
    }

    /// Single-use address that is fulfilled once `amount` has been deposited.
    pub fn expecting(timeout_at: DateTime<Utc>, amount: u64) -> Self {
        Self {
            timeout_at: Some(timeout_at),
            multi_use: false,
            expected_amount: Some(amount),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.timeout_at.is_some_and(|t| now > t)
    }
}

/// Address bound to the [`DepositConditions`] it was allocated with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionalDepositAddress {
    pub address: Address,
    pub conditions: DepositConditions,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferRequest {
    pub address: Address,
    pub value: u64,
}

impl TransferRequest {
    pub fn new(address: impl Into<Address>, value: u64) -> Self {
        Self {
            address: address.into(),
            value,
        }
    }

    /// Minimal-value transfer to `address`.
    pub fn unit(address: impl Into<Address>) -> Self {
        Self::new(address, 1)
    }
}

/// One entry of a [`Bundle`]. Positive values credit `address`, negative values debit it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub address: Address,
    pub value: i64,
}

/// Atomic group of transactions constituting one transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    pub hash: String,
    pub transactions: Vec<Transaction>,
}

impl Bundle {
    /// Address of the first transaction, which is the destination of the transfer.
    pub fn head_address(&self) -> Option<&str> {
        self.transactions.first().map(|tx| tx.address.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    DepositConfirmed,
    TransferSent,
}

/// Event raised by a [`LedgerAccount`] on its notification stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationEvent {
    pub account: AccountId,
    pub kind: EventKind,
    pub address: Address,
    pub bundle: Bundle,
}

impl NotificationEvent {
    pub fn new(account: AccountId, kind: EventKind, bundle: Bundle) -> Self {
        let address = bundle.head_address().unwrap_or_default().to_owned();
        Self {
            account,
            kind,
            address,
            bundle,
        }
    }
}

#[async_trait]
pub trait LedgerAccount: Send + Sync {
    fn id(&self) -> &AccountId;

    async fn start(&self) -> Result<(), LedgerError>;

    async fn shutdown(&self) -> Result<(), LedgerError>;

    /// Spendable balance, excluding unconfirmed incoming value.
    async fn available_balance(&self) -> Result<u64, LedgerError>;

    /// Available balance plus unconfirmed incoming value.
    async fn total_balance(&self) -> Result<u64, LedgerError>;

    async fn allocate_deposit_address(
        &self,
        conditions: DepositConditions,
    ) -> Result<ConditionalDepositAddress, LedgerError>;

    /// Submits the given transfers as one bundle.
    async fn send(&self, transfers: &[TransferRequest]) -> Result<Bundle, LedgerError>;

    /// Hands out the receiving end of the notification stream. Returns `None` once taken.
    fn take_events(&self) -> Option<mpsc::UnboundedReceiver<NotificationEvent>>;
}
