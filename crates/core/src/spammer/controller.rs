use super::{report, ConfirmationSynchronizer};
use crate::{
    error::RuntimeErrorKind,
    ledger::{AccountId, ConditionalDepositAddress, DepositConditions, LedgerAccount, TransferRequest},
    Error, Result,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Outcome of one controller iteration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// The sender had nothing available; roles were swapped.
    Switched,
    /// `amount` unit transfers were issued to `deposit` and each one was confirmed.
    SentBatch {
        amount: u64,
        deposit: ConditionalDepositAddress,
    },
}

/// Moves the sender's whole available balance to the receiver, one unit at a time,
/// swapping roles whenever the sender runs dry.
pub struct SpamController<A>
where
    A: LedgerAccount + ?Sized,
{
    sender: Arc<A>,
    receiver: Arc<A>,
    sync: Arc<ConfirmationSynchronizer>,
    deposit_timeout_at: DateTime<Utc>,
    cancel: CancellationToken,
}

impl<A> SpamController<A>
where
    A: LedgerAccount + ?Sized,
{
    /// `deposit_timeout_at` is used for every deposit address this controller allocates.
    pub fn new(
        sender: Arc<A>,
        receiver: Arc<A>,
        sync: Arc<ConfirmationSynchronizer>,
        deposit_timeout_at: DateTime<Utc>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        if sender.id() == receiver.id() {
            return Err(RuntimeErrorKind::SameAccount(sender.id().clone()).into());
        }
        Ok(Self {
            sender,
            receiver,
            sync,
            deposit_timeout_at,
            cancel,
        })
    }

    pub fn sender_id(&self) -> &AccountId {
        self.sender.id()
    }

    pub fn receiver_id(&self) -> &AccountId {
        self.receiver.id()
    }

    /// Iterates until cancelled. Returns the first error; there is no retry.
    pub async fn run(&mut self) -> Result<()> {
        let cancel = self.cancel.clone();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("spam controller cancelled");
                    return Ok(());
                }
                step = self.step() => {
                    if step? == Step::Switched {
                        // both accounts may be empty; let the relays and the cancel branch run
                        tokio::task::yield_now().await;
                    }
                }
            }
        }
    }

    pub async fn step(&mut self) -> Result<Step> {
        let available = self.sender.available_balance().await?;
        if available == 0 {
            self.switch_roles();
            return Ok(Step::Switched);
        }

        println!(
            "{}",
            report::batch_start(self.sender.id(), self.receiver.id(), available)
        );
        let deposit = self
            .receiver
            .allocate_deposit_address(DepositConditions::expecting(
                self.deposit_timeout_at,
                available,
            ))
            .await?;
        let transfer = TransferRequest::unit(deposit.address.clone());

        for i in 1..=available {
            println!("{}", report::before_sent(i, available));
            self.sync.mark_outstanding();
            self.sender
                .send(std::slice::from_ref(&transfer))
                .await
                .map_err(Error::Send)?;
            self.sync.await_drained().await?;
            println!("{}", report::after_sent(i, available));
        }
        debug!(amount = available, address = %deposit.address, "batch confirmed");

        Ok(Step::SentBatch {
            amount: available,
            deposit,
        })
    }

    fn switch_roles(&mut self) {
        std::mem::swap(&mut self.sender, &mut self.receiver);
        println!("{}", report::ROLE_SWITCH);
        debug!(
            sender = %self.sender.id().short(),
            receiver = %self.receiver.id().short(),
            "roles switched"
        );
    }
}
