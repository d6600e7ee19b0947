use crate::{Error, Result, DB_VERSION};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, Row};
use seesaw_core::{
    db::{AccountState, AccountStore, DbError},
    ledger::AccountId,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;

#[derive(Debug)]
struct SqliteConnectionCustomizer;

impl r2d2::CustomizeConnection<rusqlite::Connection, rusqlite::Error>
    for SqliteConnectionCustomizer
{
    fn on_acquire(
        &self,
        conn: &mut rusqlite::Connection,
    ) -> std::result::Result<(), rusqlite::Error> {
        // both accounts and an external `fund` process write to the same file
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        Ok(())
    }
}

/// [`AccountStore`] backed by a pooled SQLite database.
pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
    closed: AtomicBool,
}

/// One row of the `account_state` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountStateRow {
    pub account_id: AccountId,
    pub state: AccountState,
    pub updated_at: i64,
}

impl AccountStateRow {
    fn from_row(row: &Row) -> rusqlite::Result<(String, String, i64)> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?))
    }
}

impl SqliteStore {
    pub fn from_file(file: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(file);
        let pool = Pool::builder()
            .max_size(4)
            .connection_timeout(Duration::from_secs(30))
            .connection_customizer(Box::new(SqliteConnectionCustomizer))
            .build(manager)?;
        Ok(Self {
            pool,
            closed: AtomicBool::new(false),
        })
    }

    pub fn new_memory() -> Result<Self> {
        // a single connection, otherwise every pooled connection gets its own database
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .connection_customizer(Box::new(SqliteConnectionCustomizer))
            .build(manager)?;
        Ok(Self {
            pool,
            closed: AtomicBool::new(false),
        })
    }

    fn get_conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::Closed);
        }
        Ok(self.pool.get()?)
    }

    pub fn create_tables(&self) -> Result<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(&format!(
            "PRAGMA user_version = {DB_VERSION};
            CREATE TABLE IF NOT EXISTS account_state (
                account_id TEXT PRIMARY KEY,
                state TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );"
        ))?;
        Ok(())
    }

    pub fn version(&self) -> u64 {
        self.get_conn()
            .and_then(|conn| {
                let version: i64 =
                    conn.query_row("PRAGMA user_version", params![], |row| row.get(0))?;
                Ok(version as u64)
            })
            .unwrap_or(0)
    }

    /// Deletes every stored account state.
    pub fn reset(&self) -> Result<()> {
        self.get_conn()?
            .execute("DELETE FROM account_state", params![])?;
        Ok(())
    }

    /// All stored account states, ordered by account id.
    pub fn list_states(&self) -> Result<Vec<AccountStateRow>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT account_id, state, updated_at FROM account_state ORDER BY account_id",
        )?;
        let rows = stmt
            .query_map(params![], AccountStateRow::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(account_id, state, updated_at)| {
                Ok(AccountStateRow {
                    account_id: AccountId::new(account_id),
                    state: AccountState::decode(&state)?,
                    updated_at,
                })
            })
            .collect()
    }

    fn load(&self, account: &AccountId) -> Result<Option<AccountState>> {
        let raw: Option<String> = self
            .get_conn()?
            .query_row(
                "SELECT state FROM account_state WHERE account_id = ?1",
                params![account.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(raw.map(|raw| AccountState::decode(&raw)).transpose()?)
    }

    fn save(&self, account: &AccountId, state: &AccountState) -> Result<()> {
        let encoded = state.encode()?;
        debug!(account = %account.short(), %encoded, "saving account state");
        self.get_conn()?.execute(
            "INSERT INTO account_state (account_id, state, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(account_id) DO UPDATE SET state = excluded.state, updated_at = excluded.updated_at",
            params![account.as_str(), encoded, chrono::Utc::now().timestamp()],
        )?;
        Ok(())
    }
}

impl AccountStore for SqliteStore {
    fn load_state(&self, account: &AccountId) -> std::result::Result<Option<AccountState>, DbError> {
        Ok(self.load(account)?)
    }

    fn save_state(
        &self,
        account: &AccountId,
        state: &AccountState,
    ) -> std::result::Result<(), DbError> {
        Ok(self.save(account, state)?)
    }

    /// Checkpoints the write-ahead log and refuses further access.
    fn close(&self) -> std::result::Result<(), DbError> {
        if self.closed.load(Ordering::SeqCst) {
            return Ok(());
        }
        let checkpoint = self
            .get_conn()
            .and_then(|conn| Ok(conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?));
        self.closed.store(true, Ordering::SeqCst);
        checkpoint?;
        debug!("account store closed");
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
