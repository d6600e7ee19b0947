use super::{report, ConfirmationSynchronizer};
use crate::ledger::{EventKind, NotificationEvent};
use std::sync::Arc;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Forwards one account's notification stream into the [`ConfirmationSynchronizer`].
pub struct EventRelay {
    /// 1-based position of the account, used in trace lines.
    account: usize,
    events: mpsc::UnboundedReceiver<NotificationEvent>,
    sync: Arc<ConfirmationSynchronizer>,
    cancel: CancellationToken,
}

impl EventRelay {
    pub fn new(
        account: usize,
        events: mpsc::UnboundedReceiver<NotificationEvent>,
        sync: Arc<ConfirmationSynchronizer>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            account,
            events,
            sync,
            cancel,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::task::spawn(self.run())
    }

    /// Runs until cancelled or until the account drops its end of the stream.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!(account = self.account, "relay cancelled");
                    break;
                }
                event = self.events.recv() => match event {
                    Some(event) => self.dispatch(&event),
                    None => {
                        debug!(account = self.account, "notification stream closed");
                        break;
                    }
                }
            }
        }
    }

    fn dispatch(&self, event: &NotificationEvent) {
        debug!(account = self.account, kind = %event.kind, bundle = %event.bundle.hash, "relaying event");
        match event.kind {
            EventKind::DepositConfirmed => {
                println!("{}", report::deposit_received(self.account, &event.address));
                self.sync.on_deposit_confirmed(event);
            }
            EventKind::TransferSent => {
                println!("{}", report::transfer_sent(self.account, &event.address));
                self.sync.on_transfer_sent(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{AccountId, Bundle};

    fn event(kind: EventKind) -> NotificationEvent {
        NotificationEvent {
            account: AccountId::new("ACCOUNT"),
            kind,
            address: "ADDR".to_owned(),
            bundle: Bundle {
                hash: "HASH".to_owned(),
                transactions: vec![],
            },
        }
    }

    #[tokio::test]
    async fn deposits_drain_the_counter() {
        let sync = Arc::new(ConfirmationSynchronizer::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let handle = EventRelay::new(1, rx, sync.clone(), cancel.clone()).spawn();

        sync.mark_outstanding();
        tx.send(event(EventKind::TransferSent)).unwrap();
        tx.send(event(EventKind::DepositConfirmed)).unwrap();
        sync.await_drained().await.unwrap();
        assert_eq!(sync.outstanding(), 0);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn stops_when_stream_closes() {
        let sync = Arc::new(ConfirmationSynchronizer::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = EventRelay::new(2, rx, sync.clone(), CancellationToken::new()).spawn();

        sync.mark_outstanding();
        tx.send(event(EventKind::TransferSent)).unwrap();
        drop(tx);
        handle.await.unwrap();
        assert_eq!(sync.outstanding(), 1);
    }
}
