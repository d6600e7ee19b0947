use super::report;
use crate::{
    ledger::{ConditionalDepositAddress, DepositConditions, LedgerAccount},
    Result,
};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::debug;

/// Lifetime of every deposit address, counted from process start.
pub const DEFAULT_DEPOSIT_TIMEOUT_HOURS: u64 = 72;

/// Interval between balance polls while waiting for the first deposit.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FundingOutcome {
    /// Single-use address the operator was asked to fund.
    pub deposit: ConditionalDepositAddress,
    pub balance: u64,
}

/// Asks the operator to fund `primary` and polls its total balance until it is non-zero.
/// Any ledger failure is returned as-is; nothing is retried.
pub async fn await_funding<A>(
    primary: &A,
    timeout_at: DateTime<Utc>,
    poll_interval: Duration,
) -> Result<FundingOutcome>
where
    A: LedgerAccount + ?Sized,
{
    let deposit = primary
        .allocate_deposit_address(DepositConditions::single_use(timeout_at))
        .await?;
    println!("{}", report::bootstrap_prompt(&deposit.address));

    loop {
        let balance = primary.total_balance().await?;
        if balance != 0 {
            println!(
                "{}",
                report::bootstrap_success(balance, &deposit.address)
            );
            return Ok(FundingOutcome { deposit, balance });
        }
        debug!("waiting for funds on {}", deposit.address);
        tokio::time::sleep(poll_interval).await;
    }
}
