use crate::ledger::NotificationEvent;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("outstanding-confirmation counter was dropped while waiting")]
    Closed,
}

/// Gates the send loop on deposit confirmations.
///
/// The controller calls [`mark_outstanding`](Self::mark_outstanding) right before each unit
/// submission and then [`await_drained`](Self::await_drained). Relays call
/// [`on_deposit_confirmed`](Self::on_deposit_confirmed) for every deposit, whichever account
/// raised it; nothing ties a deposit to the transfer that incremented the counter.
#[derive(Debug)]
pub struct ConfirmationSynchronizer {
    outstanding: watch::Sender<u64>,
}

impl Default for ConfirmationSynchronizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfirmationSynchronizer {
    pub fn new() -> Self {
        let (outstanding, _) = watch::channel(0);
        Self { outstanding }
    }

    pub fn outstanding(&self) -> u64 {
        *self.outstanding.borrow()
    }

    pub fn mark_outstanding(&self) {
        self.outstanding.send_modify(|n| *n += 1);
    }

    /// Resolves once no confirmation is outstanding. Resolves immediately if none is.
    pub async fn await_drained(&self) -> Result<(), SyncError> {
        let mut outstanding = self.outstanding.subscribe();
        outstanding
            .wait_for(|n| *n == 0)
            .await
            .map_err(|_| SyncError::Closed)?;
        Ok(())
    }

    /// Decrements the counter. A deposit arriving with nothing outstanding leaves the counter
    /// at zero and returns `false`.
    pub fn on_deposit_confirmed(&self, event: &NotificationEvent) -> bool {
        let mut decremented = false;
        self.outstanding.send_if_modified(|n| {
            if *n == 0 {
                return false;
            }
            *n -= 1;
            decremented = true;
            true
        });
        if decremented {
            debug!(account = %event.account.short(), address = %event.address, "deposit confirmed");
        } else {
            warn!(
                account = %event.account.short(),
                address = %event.address,
                "deposit confirmed with no outstanding transfer"
            );
        }
        decremented
    }

    pub fn on_transfer_sent(&self, event: &NotificationEvent) {
        debug!(
            account = %event.account.short(),
            address = %event.address,
            bundle = %event.bundle.hash,
            outstanding = self.outstanding(),
            "transfer sent"
        );
    }
}
