use super::{error::ArgsError, Result, StoreArgs};
use crate::util::open_store;
use seesaw_core::{
    db::AccountStore,
    ledger::{sim::account_id_from_seed, sim::SimLedger, SystemTimeSource},
    spammer::report,
};
use std::sync::Arc;
use tracing::info;

/// Credits `amount` to account 1 or 2, as an operator deposit would.
/// A running spammer sharing the same database picks the funds up on its next balance poll.
pub fn fund(store_args: &StoreArgs, account: u8, amount: u64) -> Result<()> {
    if amount == 0 {
        return Err(ArgsError::AmountZero.into());
    }
    let config = store_args.resolve_config()?;
    let (primary, secondary) = config.seed_pair()?;
    let seed = if account == 1 { primary } else { secondary };

    let store = Arc::new(open_store(&config.db_path)?);
    let ledger = SimLedger::new(store.clone(), Arc::new(SystemTimeSource), Default::default());
    let id = account_id_from_seed(seed);
    let balance = ledger.credit(&id, amount)?;
    store.close()?;

    info!(account = %id.short(), amount, "account credited");
    println!("Account {account} balance is now {balance}");
    Ok(())
}

/// Prints the confirmed balance of both accounts.
pub fn balance(store_args: &StoreArgs) -> Result<()> {
    let (primary, secondary) = balances(store_args)?;
    println!("{}", report::current_balances(primary, secondary));
    Ok(())
}

fn balances(store_args: &StoreArgs) -> Result<(u64, u64)> {
    let config = store_args.resolve_config()?;
    let (primary, secondary) = config.seed_pair()?;
    let store = open_store(&config.db_path)?;
    let load = |seed: &str| -> Result<u64> {
        Ok(store
            .load_state(&account_id_from_seed(seed))?
            .unwrap_or_default()
            .balance)
    };
    let balances = (load(primary)?, load(secondary)?);
    store.close()?;
    Ok(balances)
}
