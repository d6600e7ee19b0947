use crate::{commands::Result, util::open_store};
use seesaw_core::db::AccountStore;
use std::fs;
use tracing::{info, warn};

/// Delete the database file
pub async fn drop_db(db_path: &str) -> Result<()> {
    if fs::metadata(db_path).is_ok() {
        fs::remove_file(db_path)?;
        // WAL side files belong to the deleted database
        for suffix in ["-wal", "-shm"] {
            let side = format!("{db_path}{suffix}");
            if fs::metadata(&side).is_ok() {
                fs::remove_file(&side)?;
            }
        }
        info!("Database file '{db_path}' has been deleted.");
    } else {
        info!("Database file '{db_path}' does not exist.");
    }
    Ok(())
}

/// Clear every account state. A file that cannot be opened as a store of the current
/// version is dropped and recreated instead.
pub async fn reset_db(db_path: &str) -> Result<()> {
    let store = match open_store(db_path) {
        Ok(store) => {
            store.reset()?;
            store
        }
        Err(e) => {
            warn!("cannot open '{db_path}' ({e}), recreating it");
            drop_db(db_path).await?;
            open_store(db_path)?
        }
    };
    store.close()?;
    info!("Database has been reset.");
    Ok(())
}
