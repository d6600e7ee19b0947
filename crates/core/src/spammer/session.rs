use super::{
    await_funding, report, ConfirmationSynchronizer, EventRelay, FundingOutcome, SpamController,
    DEFAULT_DEPOSIT_TIMEOUT_HOURS, DEFAULT_POLL_INTERVAL,
};
use crate::{
    error::RuntimeErrorKind,
    ledger::{LedgerAccount, TimeSource},
    Result,
};
use chrono::{DateTime, TimeDelta, Utc};
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Clone, Debug)]
pub struct SessionParams {
    /// Lifetime of deposit addresses, counted from session start.
    pub deposit_timeout: TimeDelta,
    /// Balance poll interval while waiting for the first deposit.
    pub poll_interval: Duration,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            deposit_timeout: TimeDelta::hours(DEFAULT_DEPOSIT_TIMEOUT_HOURS as i64),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Everything a spam run shares: both accounts, the synchronizer, the deposit expiry captured
/// at start, and the relay tasks. Relays are cancelled and joined by [`SpamSession::shutdown`].
pub struct SpamSession<A>
where
    A: LedgerAccount + ?Sized + 'static,
{
    primary: Arc<A>,
    secondary: Arc<A>,
    sync: Arc<ConfirmationSynchronizer>,
    deposit_timeout_at: DateTime<Utc>,
    poll_interval: Duration,
    cancel: CancellationToken,
    relays: Vec<JoinHandle<()>>,
}

impl<A> SpamSession<A>
where
    A: LedgerAccount + ?Sized + 'static,
{
    /// Captures the deposit expiry and spawns one relay per account.
    /// Must be called from within a tokio runtime.
    pub fn start(
        primary: Arc<A>,
        secondary: Arc<A>,
        time: &dyn TimeSource,
        params: SessionParams,
    ) -> Result<Self> {
        if primary.id() == secondary.id() {
            return Err(RuntimeErrorKind::SameAccount(primary.id().clone()).into());
        }
        let deposit_timeout_at = time
            .now()?
            .checked_add_signed(params.deposit_timeout)
            .ok_or(RuntimeErrorKind::DepositTimeoutOutOfRange(params.deposit_timeout))?;
        let sync = Arc::new(ConfirmationSynchronizer::new());
        let cancel = CancellationToken::new();

        let mut relays = Vec::with_capacity(2);
        for (ordinal, account) in [&primary, &secondary].into_iter().enumerate() {
            let events = account
                .take_events()
                .ok_or_else(|| RuntimeErrorKind::EventsTaken(account.id().clone()))?;
            relays.push(EventRelay::new(ordinal + 1, events, sync.clone(), cancel.clone()).spawn());
        }
        debug!(%deposit_timeout_at, "session started");

        Ok(Self {
            primary,
            secondary,
            sync,
            deposit_timeout_at,
            poll_interval: params.poll_interval,
            cancel,
            relays,
        })
    }

    pub fn deposit_timeout_at(&self) -> DateTime<Utc> {
        self.deposit_timeout_at
    }

    /// Waits for an operator deposit when both accounts are empty.
    /// Returns `None` when at least one account already holds funds.
    pub async fn ensure_funded(&self) -> Result<Option<FundingOutcome>> {
        let primary = self.primary.total_balance().await?;
        let secondary = self.secondary.total_balance().await?;
        if primary == 0 && secondary == 0 {
            let outcome = await_funding(
                self.primary.as_ref(),
                self.deposit_timeout_at,
                self.poll_interval,
            )
            .await?;
            return Ok(Some(outcome));
        }
        println!("{}", report::current_balances(primary, secondary));
        Ok(None)
    }

    /// The primary account sends first if it holds anything, otherwise the secondary.
    pub async fn select_initial_sender(&self) -> Result<SpamController<A>> {
        let (sender, receiver, ordinal) = if self.primary.total_balance().await? > 0 {
            (&self.primary, &self.secondary, 1)
        } else {
            (&self.secondary, &self.primary, 2)
        };
        println!("{}", report::starting_with(ordinal));
        SpamController::new(
            sender.clone(),
            receiver.clone(),
            self.sync.clone(),
            self.deposit_timeout_at,
            self.cancel.clone(),
        )
    }

    /// Cancels the controller and relays, then joins the relays.
    pub async fn shutdown(self) -> Result<()> {
        self.cancel.cancel();
        for res in futures::future::join_all(self.relays).await {
            res.map_err(RuntimeErrorKind::RelayJoin)?;
        }
        info!("session shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::MockStore,
        ledger::{
            sim::{SimAccount, SimLedger, SimLedgerConfig},
            DepositConditions, FixedTimeSource,
        },
        spammer::Step,
        Error,
    };

    struct Setup {
        ledger: SimLedger,
        a: Arc<SimAccount>,
        b: Arc<SimAccount>,
        time: FixedTimeSource,
    }

    async fn setup() -> Setup {
        let ledger = SimLedger::new(
            Arc::new(MockStore::new()),
            Arc::new(FixedTimeSource::new(Utc::now())),
            SimLedgerConfig {
                confirmation_delay: Duration::from_millis(1),
                ..Default::default()
            },
        );
        let a = Arc::new(ledger.account("SEED9ONE").unwrap());
        let b = Arc::new(ledger.account("SEED9TWO").unwrap());
        a.start().await.unwrap();
        b.start().await.unwrap();
        Setup {
            ledger,
            a,
            b,
            time: FixedTimeSource::new(Utc::now()),
        }
    }

    #[tokio::test]
    async fn expiry_is_captured_once() {
        let s = setup().await;
        let session = SpamSession::start(s.a, s.b, &s.time, SessionParams::default()).unwrap();
        let expected = s.time.now().unwrap() + TimeDelta::hours(72);
        assert_eq!(session.deposit_timeout_at(), expected);

        s.time.advance(TimeDelta::hours(10)).unwrap();
        assert_eq!(session.deposit_timeout_at(), expected);
        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn unrepresentable_expiry_is_an_error() {
        let s = setup().await;
        let params = SessionParams {
            deposit_timeout: TimeDelta::MAX,
            ..Default::default()
        };
        let res = SpamSession::start(s.a, s.b, &s.time, params);
        assert!(matches!(
            res,
            Err(Error::Runtime(RuntimeErrorKind::DepositTimeoutOutOfRange(_)))
        ));
    }

    #[tokio::test]
    async fn event_streams_can_only_be_claimed_once() {
        let s = setup().await;
        let first = SpamSession::start(
            s.a.clone(),
            s.b.clone(),
            &s.time,
            SessionParams::default(),
        )
        .unwrap();
        let second = SpamSession::start(s.a, s.b, &s.time, SessionParams::default());
        assert!(matches!(
            second,
            Err(Error::Runtime(RuntimeErrorKind::EventsTaken(_)))
        ));
        first.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn funded_secondary_sends_first() {
        let s = setup().await;
        s.ledger.credit(s.b.id(), 3).unwrap();
        let session = SpamSession::start(
            s.a.clone(),
            s.b.clone(),
            &s.time,
            SessionParams::default(),
        )
        .unwrap();

        assert_eq!(session.ensure_funded().await.unwrap(), None);
        let mut controller = session.select_initial_sender().await.unwrap();
        assert_eq!(controller.sender_id(), s.b.id());

        let step = controller.step().await.unwrap();
        assert!(matches!(step, Step::SentBatch { amount: 3, .. }));
        assert_eq!(s.a.available_balance().await.unwrap(), 3);
        session.shutdown().await.unwrap();
        s.ledger.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn empty_accounts_wait_for_operator_deposit() {
        let s = setup().await;
        let session = Arc::new(
            SpamSession::start(
                s.a.clone(),
                s.b.clone(),
                &s.time,
                SessionParams::default(),
            )
            .unwrap(),
        );

        let waiter = tokio::spawn({
            let session = session.clone();
            async move { session.ensure_funded().await }
        });
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!waiter.is_finished());

        s.ledger.credit(s.a.id(), 4).unwrap();
        let outcome = waiter.await.unwrap().unwrap().unwrap();
        assert_eq!(outcome.balance, 4);
        // single-use, expiring 72h after the session started
        assert_eq!(
            outcome.deposit.conditions,
            DepositConditions::single_use(s.time.now().unwrap() + TimeDelta::hours(72))
        );

        let controller = session.select_initial_sender().await.unwrap();
        assert_eq!(controller.sender_id(), s.a.id());
    }
}
