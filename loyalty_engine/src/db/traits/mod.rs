//! #  Ledger store contracts.
//!
//! This module defines the behaviour that a database backend has to provide to host the loyalty ledger. All
//! correctness under concurrency (unique order numbers, at-most-once credits, non-negative balances) is delegated to
//! the backend, so implementations must honour the atomicity notes on each method.
//!
//! * [`LedgerDatabase`] holds the state-changing operations: uploading orders, claiming orders for reconciliation,
//!   applying oracle verdicts and recording withdrawals.
//! * [`OrderManagement`] provides read-only queries over orders.
//! * [`BalanceManagement`] provides read-only queries over balances and withdrawals, including the re-summation used
//!   to audit the materialised balance.
//!
//! Methods return `impl Future + Send` so that backends can be driven from spawned tasks.
mod balance_management;
mod ledger_database;
mod order_management;

mod data_objects;

pub use balance_management::BalanceManagement;
pub use data_objects::{InsertOrderResult, InsertWithdrawalResult};
pub use ledger_database::LedgerDatabase;
pub use order_management::OrderManagement;
