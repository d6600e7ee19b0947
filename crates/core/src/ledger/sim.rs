//! In-process ledger implementing [`LedgerAccount`].
//!
//! Balances live in the shared [`AccountStore`] and are re-read on every query, so a separate
//! process crediting the store is picked up by a running spammer. A transfer debits the sender
//! immediately, is reported as `TransferSent` to the sender, and is credited to the owner of the
//! destination address after `confirmation_delay`, reported as `DepositConfirmed`.
use super::{
    random_trytes, trytes_from_seed, AccountId, Address, Bundle, ConditionalDepositAddress,
    DepositConditions, EventKind, LedgerAccount, LedgerError, NotificationEvent, TimeSource,
    Transaction, TransferRequest, HASH_TRYTES,
};
use crate::db::{AccountState, AccountStore};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex, MutexGuard,
    },
    time::Duration,
};
use tokio::sync::mpsc;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, warn};

pub const DEFAULT_CONFIRMATION_DELAY: Duration = Duration::from_millis(500);

#[derive(Clone, Debug)]
pub struct SimLedgerConfig {
    /// Time between a send and the matching deposit confirmation.
    pub confirmation_delay: Duration,
    /// Once this many sends have succeeded, every further send is rejected.
    pub fail_send_after: Option<u64>,
}

impl Default for SimLedgerConfig {
    fn default() -> Self {
        Self {
            confirmation_delay: DEFAULT_CONFIRMATION_DELAY,
            fail_send_after: None,
        }
    }
}

/// Derives the account identity for `seed`.
pub fn account_id_from_seed(seed: &str) -> AccountId {
    AccountId::new(trytes_from_seed(seed.as_bytes(), HASH_TRYTES))
}

#[derive(Clone)]
pub struct SimLedger {
    inner: Arc<LedgerInner>,
}

struct LedgerInner {
    store: Arc<dyn AccountStore>,
    time: Arc<dyn TimeSource>,
    config: SimLedgerConfig,
    state: Mutex<LedgerState>,
    sends: AtomicU64,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

#[derive(Default)]
struct LedgerState {
    addresses: HashMap<Address, DepositSlot>,
    /// Unconfirmed incoming value per account.
    pending: HashMap<AccountId, u64>,
    subscribers: HashMap<AccountId, mpsc::UnboundedSender<NotificationEvent>>,
    bundles: u64,
}

struct DepositSlot {
    owner: AccountId,
    conditions: DepositConditions,
    received: u64,
}

impl DepositSlot {
    fn accepts(&self, value: u64) -> bool {
        if self.conditions.multi_use {
            return true;
        }
        match self.conditions.expected_amount {
            Some(expected) => self
                .received
                .checked_add(value)
                .is_some_and(|total| total <= expected),
            None => self.received == 0,
        }
    }
}

#[derive(Debug)]
struct Credit {
    owner: AccountId,
    value: u64,
}

struct Submitted {
    bundle: Bundle,
    credits: Vec<Credit>,
    notify: Option<mpsc::UnboundedSender<NotificationEvent>>,
}

impl SimLedger {
    pub fn new(
        store: Arc<dyn AccountStore>,
        time: Arc<dyn TimeSource>,
        config: SimLedgerConfig,
    ) -> Self {
        Self {
            inner: Arc::new(LedgerInner {
                store,
                time,
                config,
                state: Mutex::new(LedgerState::default()),
                sends: AtomicU64::new(0),
                cancel: CancellationToken::new(),
                tracker: TaskTracker::new(),
            }),
        }
    }

    /// Builds the account for `seed`. Building the same seed twice replaces the
    /// notification stream of the earlier instance.
    pub fn account(&self, seed: &str) -> Result<SimAccount, LedgerError> {
        let id = account_id_from_seed(seed);
        let (sender, receiver) = mpsc::unbounded_channel();
        self.inner
            .lock_state()?
            .subscribers
            .insert(id.clone(), sender);
        Ok(SimAccount {
            id,
            inner: self.inner.clone(),
            events: Mutex::new(Some(receiver)),
            started: AtomicBool::new(false),
        })
    }

    /// Adds `amount` to the confirmed balance of `account`, as an external deposit would.
    /// Returns the new balance.
    pub fn credit(&self, account: &AccountId, amount: u64) -> Result<u64, LedgerError> {
        let _guard = self.inner.lock_state()?;
        let mut state = self.inner.store.load_state(account)?.unwrap_or_default();
        state.balance = state
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::ValueOverflow)?;
        self.inner.store.save_state(account, &state)?;
        Ok(state.balance)
    }

    /// Number of sends accepted so far.
    pub fn sends(&self) -> u64 {
        self.inner.sends.load(Ordering::SeqCst)
    }

    /// Abandons pending confirmations and waits for their tasks to finish.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
    }
}

impl LedgerInner {
    fn lock_state(&self) -> Result<MutexGuard<'_, LedgerState>, LedgerError> {
        self.state.lock().map_err(|_| LedgerError::Poisoned)
    }

    fn confirmed_balance(&self, account: &AccountId) -> Result<u64, LedgerError> {
        Ok(self.store.load_state(account)?.unwrap_or_default().balance)
    }

    /// Validates and applies the debit side of a transfer.
    fn submit(
        &self,
        sender: &AccountId,
        transfers: &[TransferRequest],
    ) -> Result<Submitted, LedgerError> {
        if transfers.is_empty() {
            return Err(LedgerError::EmptyBundle);
        }
        if let Some(limit) = self.config.fail_send_after {
            if self.sends.load(Ordering::SeqCst) >= limit {
                return Err(LedgerError::Rejected(format!(
                    "ledger accepts no more than {limit} sends"
                )));
            }
        }
        let now = self.time.now()?;
        let required = transfers
            .iter()
            .try_fold(0u64, |acc, t| acc.checked_add(t.value))
            .ok_or(LedgerError::ValueOverflow)?;
        let debit = i64::try_from(required).map_err(|_| LedgerError::ValueOverflow)?;

        let mut guard = self.lock_state()?;
        let state = &mut *guard;
        // a bundle may pay the same address more than once; check the sum per address
        let mut per_address: HashMap<&Address, u64> = HashMap::new();
        for t in transfers {
            if t.value == 0 {
                return Err(LedgerError::ZeroValue(t.address.clone()));
            }
            let total = per_address.entry(&t.address).or_default();
            *total = total
                .checked_add(t.value)
                .ok_or(LedgerError::ValueOverflow)?;
        }
        for (address, value) in per_address {
            let slot = state
                .addresses
                .get(address)
                .ok_or_else(|| LedgerError::UnknownAddress(address.clone()))?;
            if slot.conditions.is_expired_at(now) {
                return Err(LedgerError::AddressExpired(address.clone()));
            }
            if !slot.accepts(value) {
                return Err(LedgerError::AddressFulfilled(address.clone()));
            }
        }

        let mut sender_state = self.store.load_state(sender)?.unwrap_or_default();
        if sender_state.balance < required {
            return Err(LedgerError::InsufficientBalance {
                available: sender_state.balance,
                required,
            });
        }
        sender_state.balance -= required;
        self.store.save_state(sender, &sender_state)?;

        let mut credits = Vec::with_capacity(transfers.len());
        let mut transactions = Vec::with_capacity(transfers.len() + 1);
        for t in transfers {
            if let Some(slot) = state.addresses.get_mut(&t.address) {
                slot.received += t.value;
                *state.pending.entry(slot.owner.clone()).or_default() += t.value;
                credits.push(Credit {
                    owner: slot.owner.clone(),
                    value: t.value,
                });
            }
            transactions.push(Transaction {
                address: t.address.clone(),
                // every value is at most `required`, which fits in i64
                value: t.value as i64,
            });
        }
        transactions.push(Transaction {
            address: sender.to_string(),
            value: -debit,
        });

        state.bundles += 1;
        let hash = trytes_from_seed(
            format!("{sender}:{}:{}", state.bundles, transfers[0].address).as_bytes(),
            HASH_TRYTES,
        );
        self.sends.fetch_add(1, Ordering::SeqCst);
        Ok(Submitted {
            bundle: Bundle { hash, transactions },
            credits,
            notify: state.subscribers.get(sender).cloned(),
        })
    }

    fn schedule_confirmation(self: &Arc<Self>, bundle: Bundle, credits: Vec<Credit>) {
        let inner = self.clone();
        let cancel = self.cancel.clone();
        let delay = self.config.confirmation_delay;
        self.tracker.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(bundle = %bundle.hash, "confirmation abandoned");
                }
                _ = tokio::time::sleep(delay) => {
                    if let Err(e) = inner.confirm(&bundle, &credits) {
                        warn!("failed to confirm bundle {}: {e}", bundle.hash);
                    }
                }
            }
        });
    }

    /// Credits the destination owners and raises one `DepositConfirmed` per owner.
    fn confirm(&self, bundle: &Bundle, credits: &[Credit]) -> Result<(), LedgerError> {
        let mut state = self.lock_state()?;
        let mut owners: Vec<&AccountId> = vec![];
        for credit in credits {
            let mut owner_state = self.store.load_state(&credit.owner)?.unwrap_or_default();
            owner_state.balance = owner_state
                .balance
                .checked_add(credit.value)
                .ok_or(LedgerError::ValueOverflow)?;
            self.store.save_state(&credit.owner, &owner_state)?;
            if let Some(pending) = state.pending.get_mut(&credit.owner) {
                *pending = pending.saturating_sub(credit.value);
            }
            if !owners.contains(&&credit.owner) {
                owners.push(&credit.owner);
            }
        }
        for owner in owners {
            let Some(subscriber) = state.subscribers.get(owner) else {
                continue;
            };
            let event =
                NotificationEvent::new(owner.clone(), EventKind::DepositConfirmed, bundle.clone());
            if subscriber.send(event).is_err() {
                debug!(account = %owner.short(), "deposit event dropped, nobody is listening");
            }
        }
        Ok(())
    }
}

/// Account handle of a [`SimLedger`].
pub struct SimAccount {
    id: AccountId,
    inner: Arc<LedgerInner>,
    events: Mutex<Option<mpsc::UnboundedReceiver<NotificationEvent>>>,
    started: AtomicBool,
}

impl SimAccount {
    fn ensure_started(&self) -> Result<(), LedgerError> {
        if !self.started.load(Ordering::SeqCst) {
            return Err(LedgerError::AccountNotStarted(self.id.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerAccount for SimAccount {
    fn id(&self) -> &AccountId {
        &self.id
    }

    async fn start(&self) -> Result<(), LedgerError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(LedgerError::AccountAlreadyStarted(self.id.clone()));
        }
        if self.inner.store.load_state(&self.id)?.is_none() {
            self.inner
                .store
                .save_state(&self.id, &AccountState::default())?;
        }
        debug!(account = %self.id.short(), "account started");
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), LedgerError> {
        self.started.store(false, Ordering::SeqCst);
        debug!(account = %self.id.short(), "account shut down");
        Ok(())
    }

    async fn available_balance(&self) -> Result<u64, LedgerError> {
        self.ensure_started()?;
        self.inner.confirmed_balance(&self.id)
    }

    async fn total_balance(&self) -> Result<u64, LedgerError> {
        self.ensure_started()?;
        let pending = self
            .inner
            .lock_state()?
            .pending
            .get(&self.id)
            .copied()
            .unwrap_or(0);
        self.inner
            .confirmed_balance(&self.id)?
            .checked_add(pending)
            .ok_or(LedgerError::ValueOverflow)
    }

    async fn allocate_deposit_address(
        &self,
        conditions: DepositConditions,
    ) -> Result<ConditionalDepositAddress, LedgerError> {
        self.ensure_started()?;
        let address = random_trytes(HASH_TRYTES);
        self.inner.lock_state()?.addresses.insert(
            address.clone(),
            DepositSlot {
                owner: self.id.clone(),
                conditions: conditions.clone(),
                received: 0,
            },
        );
        debug!(account = %self.id.short(), %address, ?conditions, "allocated deposit address");
        Ok(ConditionalDepositAddress {
            address,
            conditions,
        })
    }

    async fn send(&self, transfers: &[TransferRequest]) -> Result<Bundle, LedgerError> {
        self.ensure_started()?;
        let Submitted {
            bundle,
            credits,
            notify,
        } = self.inner.submit(&self.id, transfers)?;
        if let Some(notify) = notify {
            let event =
                NotificationEvent::new(self.id.clone(), EventKind::TransferSent, bundle.clone());
            if notify.send(event).is_err() {
                debug!(account = %self.id.short(), "transfer event dropped, nobody is listening");
            }
        }
        self.inner.schedule_confirmation(bundle.clone(), credits);
        Ok(bundle)
    }

    fn take_events(&self) -> Option<mpsc::UnboundedReceiver<NotificationEvent>> {
        self.events.lock().ok()?.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::MockStore,
        ledger::{FixedTimeSource, SystemTimeSource},
    };
    use chrono::{TimeDelta, Utc};

    async fn setup(
        config: SimLedgerConfig,
        time: Arc<dyn TimeSource>,
    ) -> (SimLedger, SimAccount, SimAccount) {
        let ledger = SimLedger::new(Arc::new(MockStore::new()), time, config);
        let a = ledger.account("SEED9A").unwrap();
        let b = ledger.account("SEED9B").unwrap();
        a.start().await.unwrap();
        b.start().await.unwrap();
        (ledger, a, b)
    }

    fn far_future() -> chrono::DateTime<Utc> {
        Utc::now() + TimeDelta::hours(72)
    }

    #[tokio::test(start_paused = true)]
    async fn unit_transfer_is_confirmed_after_delay() {
        let (ledger, a, b) = setup(Default::default(), Arc::new(SystemTimeSource)).await;
        ledger.credit(a.id(), 3).unwrap();
        let mut a_events = a.take_events().unwrap();
        let mut b_events = b.take_events().unwrap();

        let cda = b
            .allocate_deposit_address(DepositConditions::expecting(far_future(), 3))
            .await
            .unwrap();
        let bundle = a.send(&[TransferRequest::unit(&cda.address)]).await.unwrap();
        assert_eq!(bundle.head_address(), Some(cda.address.as_str()));

        assert_eq!(a.available_balance().await.unwrap(), 2);
        assert_eq!(b.available_balance().await.unwrap(), 0);
        assert_eq!(b.total_balance().await.unwrap(), 1);

        let sent = a_events.recv().await.unwrap();
        assert_eq!(sent.kind, EventKind::TransferSent);
        assert_eq!(sent.address, cda.address);

        let deposit = b_events.recv().await.unwrap();
        assert_eq!(deposit.kind, EventKind::DepositConfirmed);
        assert_eq!(deposit.account, *b.id());
        assert_eq!(deposit.bundle, bundle);
        assert_eq!(b.available_balance().await.unwrap(), 1);
        assert_eq!(b.total_balance().await.unwrap(), 1);
        assert_eq!(ledger.sends(), 1);
    }

    #[tokio::test]
    async fn rejects_invalid_sends() {
        let (ledger, a, b) = setup(Default::default(), Arc::new(SystemTimeSource)).await;
        ledger.credit(a.id(), 1).unwrap();

        assert!(matches!(a.send(&[]).await, Err(LedgerError::EmptyBundle)));
        assert!(matches!(
            a.send(&[TransferRequest::unit("NOWHERE")]).await,
            Err(LedgerError::UnknownAddress(_))
        ));

        let cda = b
            .allocate_deposit_address(DepositConditions::single_use(far_future()))
            .await
            .unwrap();
        assert!(matches!(
            a.send(&[TransferRequest::new(&cda.address, 0)]).await,
            Err(LedgerError::ZeroValue(_))
        ));
        assert!(matches!(
            a.send(&[TransferRequest::new(&cda.address, 2)]).await,
            Err(LedgerError::InsufficientBalance {
                available: 1,
                required: 2
            })
        ));
        assert_eq!(a.available_balance().await.unwrap(), 1);
        assert_eq!(ledger.sends(), 0);
    }

    #[tokio::test]
    async fn address_stops_accepting_once_fulfilled() {
        let (ledger, a, b) = setup(Default::default(), Arc::new(SystemTimeSource)).await;
        ledger.credit(a.id(), 5).unwrap();
        let cda = b
            .allocate_deposit_address(DepositConditions::expecting(far_future(), 2))
            .await
            .unwrap();
        let unit = TransferRequest::unit(&cda.address);
        a.send(std::slice::from_ref(&unit)).await.unwrap();
        a.send(std::slice::from_ref(&unit)).await.unwrap();
        assert!(matches!(
            a.send(std::slice::from_ref(&unit)).await,
            Err(LedgerError::AddressFulfilled(_))
        ));
    }

    #[tokio::test]
    async fn bundle_cannot_overfill_expected_amount() {
        let (ledger, a, b) = setup(Default::default(), Arc::new(SystemTimeSource)).await;
        ledger.credit(a.id(), 6).unwrap();
        let cda = b
            .allocate_deposit_address(DepositConditions::expecting(far_future(), 5))
            .await
            .unwrap();
        let three = TransferRequest::new(&cda.address, 3);
        assert!(matches!(
            a.send(&[three.clone(), three.clone()]).await,
            Err(LedgerError::AddressFulfilled(_))
        ));
        assert_eq!(a.available_balance().await.unwrap(), 6);
        assert_eq!(b.total_balance().await.unwrap(), 0);
        assert_eq!(ledger.sends(), 0);

        // two transfers that sum to the expected amount are fine
        a.send(&[three, TransferRequest::new(&cda.address, 2)])
            .await
            .unwrap();
        assert_eq!(b.total_balance().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn expired_address_is_rejected() {
        let start = Utc::now();
        let time = Arc::new(FixedTimeSource::new(start));
        let (ledger, a, b) = setup(Default::default(), time.clone()).await;
        ledger.credit(a.id(), 5).unwrap();
        let cda = b
            .allocate_deposit_address(DepositConditions::expecting(
                start + TimeDelta::hours(72),
                5,
            ))
            .await
            .unwrap();
        time.advance(TimeDelta::hours(73)).unwrap();
        assert!(matches!(
            a.send(&[TransferRequest::unit(&cda.address)]).await,
            Err(LedgerError::AddressExpired(_))
        ));
    }

    #[tokio::test]
    async fn rejects_sends_past_configured_limit() {
        let config = SimLedgerConfig {
            fail_send_after: Some(1),
            ..Default::default()
        };
        let (ledger, a, b) = setup(config, Arc::new(SystemTimeSource)).await;
        ledger.credit(a.id(), 5).unwrap();
        let cda = b
            .allocate_deposit_address(DepositConditions::expecting(far_future(), 5))
            .await
            .unwrap();
        let unit = TransferRequest::unit(&cda.address);
        a.send(std::slice::from_ref(&unit)).await.unwrap();
        assert!(matches!(
            a.send(std::slice::from_ref(&unit)).await,
            Err(LedgerError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn account_lifecycle_is_enforced() {
        let ledger = SimLedger::new(
            Arc::new(MockStore::new()),
            Arc::new(SystemTimeSource),
            Default::default(),
        );
        let a = ledger.account("SEED9A").unwrap();
        assert!(matches!(
            a.available_balance().await,
            Err(LedgerError::AccountNotStarted(_))
        ));
        a.start().await.unwrap();
        assert!(matches!(
            a.start().await,
            Err(LedgerError::AccountAlreadyStarted(_))
        ));
        assert_eq!(a.total_balance().await.unwrap(), 0);
        assert!(a.take_events().is_some());
        assert!(a.take_events().is_none());
        a.shutdown().await.unwrap();
        assert!(a.total_balance().await.is_err());
    }

    #[test]
    fn seed_determines_account_id() {
        assert_eq!(account_id_from_seed("X"), account_id_from_seed("X"));
        assert_ne!(account_id_from_seed("X"), account_id_from_seed("Y"));
        assert_eq!(account_id_from_seed("X").as_str().len(), HASH_TRYTES);
    }
}
