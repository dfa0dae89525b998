//! Order reconciliation.
//!
//! Uploaded orders start out `New`, and only the external accrual oracle can say what they are worth. Reconciliation
//! is the background process that drives every order to a terminal state:
//!
//! * The [`OrderChecker`] wakes up on a fixed tick, claims the oldest order that is still waiting for a verdict and
//!   hands it to a poller task. The number of concurrent poller tasks is bounded. When every slot is busy the tick is
//!   skipped without claiming anything.
//! * The [`AccrualPoller`] asks the oracle about one order on a fixed backoff schedule until the oracle reaches a
//!   verdict or the schedule runs out. A terminal verdict is written to the ledger (and, for `Processed` orders,
//!   credited to the owner's balance) in one transaction.
//!
//! Orders whose poller gave up are not lost. Each claim hides the order from discovery for an exponentially growing
//! cooldown (see [`ClaimLease`]), after which the checker picks it up again.
//!
//! Both components watch the same [`ShutdownSignal`]. Once it fires, pollers stop before their next oracle call or
//! during their backoff sleep, and the checker waits for them before returning
//! [`ReconciliationError::Cancelled`].
mod checker;
mod poller;

use std::time::Duration;

pub use checker::OrderChecker;
pub use poller::AccrualPoller;
use thiserror::Error;
use tokio::sync::watch;

use crate::{
    db_types::{ClaimLease, OrderNumber, OrderStatusType, Points},
    oracle::OracleError,
};

/// Receiving end of the process-wide cancellation signal. Cancellation is requested by sending `true`.
pub type ShutdownSignal = watch::Receiver<bool>;

/// Creates a new cancellation signal. The sender requests shutdown with `send(true)`.
pub fn shutdown_signal() -> (watch::Sender<bool>, ShutdownSignal) {
    watch::channel(false)
}

/// Resolves once cancellation has been requested. If the sender is dropped without requesting cancellation, this never
/// resolves.
pub async fn cancelled(mut signal: ShutdownSignal) {
    let sender_dropped = signal.wait_for(|cancelled| *cancelled).await.is_err();
    if sender_dropped {
        std::future::pending::<()>().await
    }
}

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_IN_FLIGHT: usize = 16;
/// Delays between successive oracle queries for one order, in milliseconds. Seven attempts, about 10.6s in total.
pub const DEFAULT_BACKOFF_SCHEDULE_MS: [u64; 7] = [200, 400, 600, 1000, 1600, 2600, 4200];

#[derive(Debug, Clone)]
pub struct ReconciliationConfig {
    /// How often the checker looks for work.
    pub tick_interval: Duration,
    /// The poller's sleep after each attempt that did not produce a terminal verdict. The number of entries is the
    /// number of attempts.
    pub backoff_schedule: Vec<Duration>,
    /// Upper bound on concurrently running poller tasks.
    pub max_in_flight: usize,
    pub lease: ClaimLease,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            backoff_schedule: DEFAULT_BACKOFF_SCHEDULE_MS.iter().copied().map(Duration::from_millis).collect(),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            lease: ClaimLease::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReconciliationError {
    #[error("Reconciliation was cancelled")]
    Cancelled,
    #[error("Accrual oracle error: {0}")]
    OracleError(#[from] OracleError),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderNumber),
}

/// How a single poller run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The oracle granted the accrual and it has been credited.
    Processed(Points),
    /// The oracle rejected the order.
    Invalid,
    /// The order was already terminal, either before the poller started or because another poller got there first.
    /// The oracle was not consulted (or its verdict was not applied).
    AlreadyFinal(OrderStatusType),
    /// The oracle did not reach a verdict within the backoff schedule. The order keeps its current status.
    Exhausted { attempts: usize },
}
