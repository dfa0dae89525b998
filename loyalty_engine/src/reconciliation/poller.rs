use std::{fmt::Debug, time::Duration};

use log::*;

use crate::{
    db::traits::{LedgerDatabase, OrderManagement},
    db_types::{Order, OrderNumber, OrderStatusType, Points},
    events::{EventProducers, OrderAccruedEvent, OrderInvalidatedEvent},
    oracle::{AccrualOracle, OracleError, OracleStatus},
    reconciliation::{cancelled, PollOutcome, ReconciliationError, ShutdownSignal},
};

/// Drives a single order to a terminal state by polling the accrual oracle on a fixed backoff schedule.
///
/// Attempts for one order are strictly sequential. Before every attempt the poller checks the shutdown signal, and
/// the backoff sleeps are interrupted by it, so a cancelled poller stops promptly with
/// [`ReconciliationError::Cancelled`].
///
/// An oracle that cannot be reached (or answers with garbage) aborts the run immediately with an error, leaving the
/// order untouched. The checker's claim lease decides when it is tried again.
#[derive(Clone)]
pub struct AccrualPoller<B, O> {
    db: B,
    oracle: O,
    schedule: Vec<Duration>,
    producers: EventProducers,
    shutdown: ShutdownSignal,
}

impl<B, O> Debug for AccrualPoller<B, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccrualPoller ({} attempts)", self.schedule.len())
    }
}

impl<B, O> AccrualPoller<B, O>
where
    B: LedgerDatabase + OrderManagement,
    O: AccrualOracle,
{
    pub fn new(
        db: B,
        oracle: O,
        schedule: Vec<Duration>,
        producers: EventProducers,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self { db, oracle, schedule, producers, shutdown }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.shutdown.borrow()
    }

    pub async fn poll_order(&self, number: &OrderNumber) -> Result<PollOutcome, ReconciliationError> {
        let order = self
            .db
            .fetch_order_by_number(number)
            .await
            .map_err(|e| ReconciliationError::DatabaseError(e.to_string()))?
            .ok_or_else(|| ReconciliationError::OrderNotFound(number.clone()))?;
        if order.status.is_terminal() {
            debug!("🔄️ Order {number} is already {}. Nothing to do.", order.status);
            return Ok(PollOutcome::AlreadyFinal(order.status));
        }
        for (attempt, delay) in self.schedule.iter().enumerate() {
            if self.is_cancelled() {
                debug!("🔄️ Polling for order {number} cancelled before attempt {}", attempt + 1);
                return Err(ReconciliationError::Cancelled);
            }
            match self.oracle.fetch_verdict(number).await? {
                None => trace!("🔄️ No verdict for order {number} yet (attempt {})", attempt + 1),
                Some(verdict) => match verdict.status {
                    OracleStatus::Registered | OracleStatus::Processing => {
                        debug!("🔄️ Order {number} is still being processed by the oracle ({:?})", verdict.status);
                        self.mark_processing(number).await?;
                    },
                    OracleStatus::Invalid => {
                        return self.finalize(number, OrderStatusType::Invalid, Points::ZERO).await;
                    },
                    OracleStatus::Processed => {
                        let accrual = verdict.accrual.unwrap_or_default();
                        if accrual < Points::ZERO {
                            return Err(OracleError::MalformedResponse(format!(
                                "negative accrual {accrual} for order {number}"
                            ))
                            .into());
                        }
                        return self.finalize(number, OrderStatusType::Processed, accrual).await;
                    },
                },
            }
            self.pause(*delay).await?;
        }
        let attempts = self.schedule.len();
        info!("🔄️ The oracle has not reached a verdict on order {number} after {attempts} attempts");
        Ok(PollOutcome::Exhausted { attempts })
    }

    async fn mark_processing(&self, number: &OrderNumber) -> Result<(), ReconciliationError> {
        let changed = self
            .db
            .mark_order_processing(number)
            .await
            .map_err(|e| ReconciliationError::DatabaseError(e.to_string()))?;
        if changed {
            debug!("🔄️ Order {number} moved to processing");
        }
        Ok(())
    }

    async fn finalize(
        &self,
        number: &OrderNumber,
        status: OrderStatusType,
        accrual: Points,
    ) -> Result<PollOutcome, ReconciliationError> {
        let updated = self
            .db
            .update_order_terminal(number, status, accrual)
            .await
            .map_err(|e| ReconciliationError::DatabaseError(e.to_string()))?;
        match updated {
            Some(order) => {
                info!("🔄️ Order {number} is {} with an accrual of {}", order.status, order.accrual);
                self.publish(&order).await;
                Ok(match order.status {
                    OrderStatusType::Processed => PollOutcome::Processed(order.accrual),
                    _ => PollOutcome::Invalid,
                })
            },
            None => {
                // Someone else applied a verdict in the meantime.
                let current = self
                    .db
                    .fetch_order_by_number(number)
                    .await
                    .map_err(|e| ReconciliationError::DatabaseError(e.to_string()))?
                    .ok_or_else(|| ReconciliationError::OrderNotFound(number.clone()))?;
                debug!("🔄️ Order {number} was already {} when the verdict arrived", current.status);
                Ok(PollOutcome::AlreadyFinal(current.status))
            },
        }
    }

    async fn publish(&self, order: &Order) {
        match order.status {
            OrderStatusType::Processed => {
                for producer in &self.producers.order_accrued_producer {
                    producer.publish_event(OrderAccruedEvent::new(order.clone())).await;
                }
            },
            OrderStatusType::Invalid => {
                for producer in &self.producers.order_invalidated_producer {
                    producer.publish_event(OrderInvalidatedEvent::new(order.clone())).await;
                }
            },
            _ => {},
        }
    }

    async fn pause(&self, delay: Duration) -> Result<(), ReconciliationError> {
        tokio::select! {
            _ = tokio::time::sleep(delay) => Ok(()),
            _ = cancelled(self.shutdown.clone()) => Err(ReconciliationError::Cancelled),
        }
    }
}
