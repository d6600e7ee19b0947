mod bootstrap;
mod controller;
mod relay;
pub mod report;
mod session;
mod synchronizer;

pub use bootstrap::{
    await_funding, FundingOutcome, DEFAULT_DEPOSIT_TIMEOUT_HOURS, DEFAULT_POLL_INTERVAL,
};
pub use controller::{SpamController, Step};
pub use relay::EventRelay;
pub use session::{SessionParams, SpamSession};
pub use synchronizer::{ConfirmationSynchronizer, SyncError};
