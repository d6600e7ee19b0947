//! Console lines printed by the spammer. Operators and scripts match on these, so the
//! shapes are fixed.
use crate::ledger::AccountId;
use std::fmt::Display;

pub const ROLE_SWITCH: &str = "SWITCHING SENDER AND RECEIVER!";

pub fn deposit_received(account: usize, address: &str) -> String {
    format!("Account {account} > Received deposit on: {address}")
}

pub fn transfer_sent(account: usize, address: &str) -> String {
    format!("Account {account} > Sending to: {address}")
}

pub fn batch_start(sender: &AccountId, receiver: &AccountId, amount: u64) -> String {
    format!(
        "Current sender ID: {}, current receiver ID: {}, number of transactions to send: {amount}",
        sender.short(),
        receiver.short()
    )
}

pub fn before_sent(i: u64, amount: u64) -> String {
    format!("Before sent {i}/{amount}")
}

pub fn after_sent(i: u64, amount: u64) -> String {
    format!("After sent {i}/{amount}")
}

pub fn send_error(err: impl Display) -> String {
    format!("Error sending: {err}")
}

pub fn bootstrap_prompt(address: &str) -> String {
    format!("Please first deposit funds to this address in order to use the spammer:{address}")
}

pub fn bootstrap_success(amount: u64, address: &str) -> String {
    format!("Balance of {amount} has been deposited on address {address}")
}

pub fn current_balances(primary: u64, secondary: u64) -> String {
    format!("Current balance of Account1 is {primary}, balance of Account2 is: {secondary}")
}

pub fn starting_with(account: usize) -> String {
    format!("Starting with Account {account}!")
}

pub fn captured_signal(signal: &str) -> String {
    format!("Captured {signal} signal stopping and exiting..")
}
