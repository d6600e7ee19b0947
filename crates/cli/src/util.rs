use crate::{commands::Result, error::CliError};
use nu_ansi_term::{AnsiGenericString, Style};
use seesaw_sqlite::{SqliteStore, DB_VERSION};
use tracing::debug;
use tracing_subscriber::EnvFilter;

pub fn bold<'a>(msg: impl AsRef<str> + 'a) -> AnsiGenericString<'a, str> {
    Style::new().bold().paint(msg.as_ref().to_owned())
}

/// Installs the fmt subscriber. `RUST_LOG` overrides the default `info` filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .unwrap_or_else(|error| eprintln!("Error installing logger: {error}"));
}

/// Opens the store at `db_path`, creating the tables if needed.
/// Files written by a different schema version are rejected.
pub fn open_store(db_path: &str) -> Result<SqliteStore> {
    let store = SqliteStore::from_file(db_path)?;
    let found = store.version();
    if found != 0 && found != DB_VERSION {
        return Err(CliError::DbVersion {
            found,
            expected: DB_VERSION,
        });
    }
    store.create_tables()?;
    debug!("opened account store at {db_path}");
    Ok(store)
}

/// Resolves once SIGINT or SIGTERM arrives, returning the signal's name.
pub async fn shutdown_signal() -> std::io::Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            _ = sigint.recv() => Ok("SIGINT"),
            _ = sigterm.recv() => Ok("SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        Ok("SIGINT")
    }
}
