//! Loyalty Engine
//!
//! The loyalty engine keeps the points ledger for a loyalty-accrual service. Users upload the numbers of their
//! purchase orders; an external, independently operated accrual oracle decides how many points each order earns; and
//! users spend their points through withdrawals.
//!
//! The library is divided into these main sections:
//! 1. Database management and control ([`mod@db`]). The ledger store contracts live in [`db::traits`], and SQLite is
//!    the supported backend. The data types used in the database are defined in the [`db_types`] module and are
//!    public.
//! 2. The ledger API ([`mod@ledger_api`]). This is the public-facing functionality for uploading orders, querying
//!    balances and withdrawing points.
//! 3. Reconciliation ([`mod@reconciliation`]). A background checker discovers orders awaiting a verdict and polls the
//!    accrual oracle ([`mod@oracle`]) for each of them until it reaches a verdict, crediting balances as it goes.
//!
//! The engine also emits events when ledger state changes (an order is credited or rejected, a withdrawal goes
//! through). A simple hook system ([`mod@events`]) lets you subscribe to them.
pub mod db;

pub mod db_types;
pub mod events;
pub mod helpers;
pub mod ledger_api;
pub mod oracle;
pub mod reconciliation;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::{SqliteDatabase, SqliteDatabaseError};
pub use db::traits::{
    BalanceManagement,
    InsertOrderResult,
    InsertWithdrawalResult,
    LedgerDatabase,
    OrderManagement,
};
pub use ledger_api::{ledger_objects, LedgerApi, LedgerApiError};
pub use oracle::{AccrualOracle, HttpAccrualOracle, OracleError};
pub use reconciliation::{AccrualPoller, OrderChecker, PollOutcome, ReconciliationConfig, ReconciliationError};
