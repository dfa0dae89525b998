use std::{
    collections::HashSet,
    fmt::Debug,
    sync::{Arc, Mutex, MutexGuard},
};

use chrono::Utc;
use futures_util::FutureExt;
use log::*;
use tokio::{
    sync::{OwnedSemaphorePermit, Semaphore},
    task::{JoinError, JoinSet},
    time::MissedTickBehavior,
};

use crate::{
    db::traits::{LedgerDatabase, OrderManagement},
    db_types::{Order, OrderNumber},
    events::EventProducers,
    oracle::AccrualOracle,
    reconciliation::{
        cancelled,
        AccrualPoller,
        PollOutcome,
        ReconciliationConfig,
        ReconciliationError,
        ShutdownSignal,
    },
};

/// Long-lived discovery loop for orders awaiting a verdict.
///
/// On every tick the checker claims at most one order (the oldest eligible one) and dispatches an [`AccrualPoller`]
/// task for it without waiting for the result. Poller failures are logged and never stop discovery.
///
/// The claim lease normally keeps an order out of discovery while it is being polled, but a lease can be shorter than
/// a poll run. The checker therefore also tracks the order numbers it has in flight and never starts a second poller
/// for one of them.
pub struct OrderChecker<B, O> {
    db: B,
    poller: AccrualPoller<B, O>,
    config: ReconciliationConfig,
    shutdown: ShutdownSignal,
    permits: Arc<Semaphore>,
    in_flight: JoinSet<()>,
    polling: Arc<Mutex<HashSet<OrderNumber>>>,
}

impl<B, O> Debug for OrderChecker<B, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderChecker ({} polls in flight, config: {:?})", self.in_flight.len(), self.config)
    }
}

impl<B, O> OrderChecker<B, O>
where
    B: LedgerDatabase + OrderManagement,
    O: AccrualOracle,
{
    pub fn new(
        db: B,
        oracle: O,
        config: ReconciliationConfig,
        producers: EventProducers,
        shutdown: ShutdownSignal,
    ) -> Self {
        let poller =
            AccrualPoller::new(db.clone(), oracle, config.backoff_schedule.clone(), producers, shutdown.clone());
        let permits = Arc::new(Semaphore::new(config.max_in_flight.max(1)));
        Self { db, poller, config, shutdown, permits, in_flight: JoinSet::new(), polling: Arc::default() }
    }

    /// The number of poller tasks that have been dispatched and not yet reaped.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Runs the discovery loop until the shutdown signal fires.
    ///
    /// Cancellation is the only way out of the loop. Once it is requested, the checker stops claiming orders, waits for
    /// the in-flight pollers (which watch the same signal) and returns [`ReconciliationError::Cancelled`].
    pub async fn run(mut self) -> Result<(), ReconciliationError> {
        info!(
            "🔄️ Order reconciliation started. Checking every {:?} with up to {} concurrent polls",
            self.config.tick_interval, self.config.max_in_flight
        );
        let mut timer = tokio::time::interval(self.config.tick_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancelled(self.shutdown.clone()) => break,
                _ = timer.tick() => {
                    if let Err(e) = self.tick().await {
                        error!("🔄️ Error while looking for orders to reconcile: {e}");
                    }
                },
            }
        }
        info!("🔄️ Order reconciliation is shutting down. Waiting for {} polls to finish.", self.in_flight.len());
        while let Some(result) = self.in_flight.join_next().await {
            log_join_result(result);
        }
        info!("🔄️ Order reconciliation has stopped");
        Err(ReconciliationError::Cancelled)
    }

    /// Performs one discovery step and returns the number of the order that was dispatched, if any.
    ///
    /// When every worker slot is taken the step is skipped before anything is claimed, so saturation never burns a
    /// claim (and its cooldown) on an order that cannot be polled yet.
    pub async fn tick(&mut self) -> Result<Option<OrderNumber>, ReconciliationError> {
        self.reap_finished();
        let Ok(permit) = Arc::clone(&self.permits).try_acquire_owned() else {
            debug!("🔄️ All {} poll slots are busy. Skipping this tick.", self.config.max_in_flight);
            return Ok(None);
        };
        let claimed = self
            .db
            .claim_pending_order(Utc::now(), &self.config.lease)
            .await
            .map_err(|e| ReconciliationError::DatabaseError(e.to_string()))?;
        let Some(order) = claimed else {
            trace!("🔄️ No orders are waiting for a verdict");
            return Ok(None);
        };
        if !lock(&self.polling).insert(order.number.clone()) {
            debug!("🔄️ Order {} was claimed again while it is still being polled. Leaving it alone.", order.number);
            return Ok(None);
        }
        Ok(Some(self.dispatch(order, permit)))
    }

    fn dispatch(&mut self, order: Order, permit: OwnedSemaphorePermit) -> OrderNumber {
        let previous_attempts = u32::try_from(order.poll_attempts.saturating_sub(1)).unwrap_or(u32::MAX);
        debug!(
            "🔄️ Dispatching order {} (claim #{}). It will not be claimed again for {:?}.",
            order.number,
            order.poll_attempts,
            self.config.lease.cooldown(previous_attempts)
        );
        let poller = self.poller.clone();
        let number = order.number.clone();
        let tracker = InFlightOrder { polling: Arc::clone(&self.polling), number: order.number.clone() };
        self.in_flight.spawn(async move {
            let _permit = permit;
            let _tracker = tracker;
            match poller.poll_order(&number).await {
                Ok(PollOutcome::Exhausted { attempts }) => {
                    debug!("🔄️ Gave up on order {number} for now after {attempts} attempts")
                },
                Ok(outcome) => debug!("🔄️ Polling for order {number} finished: {outcome:?}"),
                Err(ReconciliationError::Cancelled) => debug!("🔄️ Polling for order {number} was cancelled"),
                Err(e) => error!("🔄️ Polling for order {number} failed: {e}"),
            }
        });
        order.number
    }

    fn reap_finished(&mut self) {
        while let Some(Some(result)) = self.in_flight.join_next().now_or_never() {
            log_join_result(result);
        }
    }
}

/// Removes the order from the in-flight set when its poller task ends, however it ends.
struct InFlightOrder {
    polling: Arc<Mutex<HashSet<OrderNumber>>>,
    number: OrderNumber,
}

impl Drop for InFlightOrder {
    fn drop(&mut self) {
        lock(&self.polling).remove(&self.number);
    }
}

fn lock(polling: &Mutex<HashSet<OrderNumber>>) -> MutexGuard<'_, HashSet<OrderNumber>> {
    // The set is never left half-updated, so a poisoned lock is still usable.
    polling.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn log_join_result(result: Result<(), JoinError>) {
    if let Err(e) = result {
        error!("🔄️ A poller task did not complete: {e}");
    }
}
