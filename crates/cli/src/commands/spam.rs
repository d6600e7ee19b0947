use super::{Result, StoreArgs};
use crate::util::{open_store, shutdown_signal};
use clap::Args;
use seesaw_config::SpamConfig;
use seesaw_core::{
    db::AccountStore,
    ledger::{
        sim::{SimAccount, SimLedger},
        LedgerAccount, SystemTimeSource,
    },
    spammer::{report, SpamSession},
    Error,
};
use std::{future::Future, sync::Arc};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Args)]
pub struct SpamCliArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Delay before a sent transfer is confirmed, in milliseconds.
    #[arg(long)]
    pub confirmation_delay_ms: Option<u64>,

    /// Reject every send after this many have succeeded.
    #[arg(long)]
    pub fail_send_after: Option<u64>,
}

impl SpamCliArgs {
    pub fn resolve_config(&self) -> Result<SpamConfig> {
        let mut config = self.store.resolve_config()?;
        if let Some(delay) = self.confirmation_delay_ms {
            config.confirmation_delay_ms = delay;
        }
        if self.fail_send_after.is_some() {
            config.fail_send_after = self.fail_send_after;
        }
        Ok(config)
    }
}

enum Outcome {
    Signal(&'static str),
    Finished(Result<()>),
}

/// Runs the spammer until a termination signal or a fatal error.
///
/// Initialization and bootstrap failures are returned. A failure in the spam loop is printed
/// and the function still returns `Ok`, as does a termination signal.
pub async fn spam(args: SpamCliArgs) -> Result<()> {
    spam_until(args, shutdown_signal()).await
}

/// Like [`spam`], with `shutdown` standing in for the termination signal.
/// `shutdown` resolves to the name of the signal.
pub async fn spam_until<F>(args: SpamCliArgs, shutdown: F) -> Result<()>
where
    F: Future<Output = std::io::Result<&'static str>>,
{
    let config = args.resolve_config()?;
    let (primary_seed, secondary_seed) = config.seed_pair()?;

    let store = Arc::new(open_store(&config.db_path)?);
    let ledger = SimLedger::new(
        store.clone(),
        Arc::new(SystemTimeSource),
        config.ledger_config(),
    );
    let primary = Arc::new(ledger.account(primary_seed)?);
    let secondary = Arc::new(ledger.account(secondary_seed)?);
    primary.start().await?;
    secondary.start().await?;
    info!(
        account1 = %primary.id().short(),
        account2 = %secondary.id().short(),
        db = %config.db_path,
        "accounts started"
    );

    let session = SpamSession::start(
        primary,
        secondary,
        &SystemTimeSource,
        config.session_params()?,
    )?;

    let outcome = tokio::select! {
        signal = shutdown => Outcome::Signal(signal?),
        res = run_session(&session) => Outcome::Finished(res),
    };

    match outcome {
        Outcome::Signal(signal) => {
            // pending transfers are abandoned
            store.close()?;
            println!("{}", report::captured_signal(signal));
            Ok(())
        }
        Outcome::Finished(res) => {
            if let Err(e) = store.close() {
                warn!("failed to close account store: {e}");
            }
            session.shutdown().await?;
            ledger.shutdown().await;
            res
        }
    }
}

async fn run_session(session: &SpamSession<SimAccount>) -> Result<()> {
    session.ensure_funded().await?;
    let mut controller = session.select_initial_sender().await?;
    if let Err(e) = controller.run().await {
        report_runtime_error(&e);
    }
    Ok(())
}

fn report_runtime_error(e: &Error) {
    if e.is_send() {
        println!("{}", report::send_error(e));
    } else {
        error!("spam loop failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seesaw_core::ledger::sim::account_id_from_seed;
    use seesaw_sqlite::SqliteStore;
    use std::time::Duration;
    use tempfile::TempDir;

    const SEEDS: [&str; 2] = ["TEST9SEED9ONE", "TEST9SEED9TWO"];

    fn args(db_path: &str, fail_send_after: Option<u64>) -> SpamCliArgs {
        SpamCliArgs {
            store: StoreArgs {
                config: None,
                db_path: Some(db_path.to_owned()),
                seeds: SEEDS.iter().map(|s| s.to_string()).collect(),
            },
            confirmation_delay_ms: Some(1),
            fail_send_after,
        }
    }

    fn seed_balance(db_path: &str, seed: &str, balance: u64) {
        let store = open_store(db_path).unwrap();
        store
            .save_state(
                &account_id_from_seed(seed),
                &seesaw_core::db::AccountState { balance },
            )
            .unwrap();
        store.close().unwrap();
    }

    fn balances(db_path: &str) -> (u64, u64) {
        let store = SqliteStore::from_file(db_path).unwrap();
        let load = |seed: &str| {
            store
                .load_state(&account_id_from_seed(seed))
                .unwrap()
                .unwrap_or_default()
                .balance
        };
        (load(SEEDS[0]), load(SEEDS[1]))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_send_ends_run_without_error() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("seesaw.db");
        let db_path = db_path.to_str().unwrap();
        seed_balance(db_path, SEEDS[0], 5);

        spam(args(db_path, Some(2))).await.unwrap();

        // two confirmed units moved before the third send failed
        assert_eq!(balances(db_path), (3, 2));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn signal_abandons_pending_confirmation() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("seesaw.db");
        let db_path = db_path.to_str().unwrap();
        seed_balance(db_path, SEEDS[0], 5);

        let mut args = args(db_path, None);
        args.confirmation_delay_ms = Some(3_600_000);
        let shutdown = async {
            tokio::time::sleep(Duration::from_millis(300)).await;
            Ok("SIGTERM")
        };
        spam_until(args, shutdown).await.unwrap();

        // the first unit left the sender and was never confirmed
        assert_eq!(balances(db_path), (4, 0));
        // closing checkpointed the write-ahead log
        if let Ok(wal) = std::fs::metadata(format!("{db_path}-wal")) {
            assert_eq!(wal.len(), 0);
        }
    }

    #[test]
    fn flags_override_ledger_settings() {
        let args = args("flags.db", Some(4));
        let config = args.resolve_config().unwrap();
        assert_eq!(config.db_path, "flags.db");
        assert_eq!(config.confirmation_delay_ms, 1);
        assert_eq!(config.fail_send_after, Some(4));
    }
}
