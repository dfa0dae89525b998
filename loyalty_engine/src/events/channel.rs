//! Simple stateless pub-sub event handler
//!
//! The accrual poller publishes [`OrderAccruedEvent`](super::OrderAccruedEvent) when a PROCESSED verdict has been
//! credited and [`OrderInvalidatedEvent`](super::OrderInvalidatedEvent) when the oracle rejects an order. The ledger
//! API publishes [`WithdrawalProcessedEvent`](super::WithdrawalProcessedEvent) once a debit has committed. The server
//! subscribes with hooks that write each event to the audit log.
//!
//! Every event type gets its own bounded channel and handler task. Handlers only see the event, never the ledger, and
//! each event is handled on its own task.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::{sync::mpsc, task::JoinSet};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct EventHandler<E: Send + Sync + 'static> {
    listener: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size);
        Self { listener: receiver, sender, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.sender.clone())
    }

    /// Runs until every producer has been dropped, then waits for the handlers that are still running.
    pub async fn start_handler(mut self) {
        debug!("📬️ Starting event handler");
        // Without this, the channel would never close, since we'd always hold a sender ourselves.
        drop(self.sender);
        let mut jobs = JoinSet::new();
        while let Some(ev) = self.listener.recv().await {
            trace!("📬️ Handling event");
            let handler = Arc::clone(&self.handler);
            jobs.spawn(async move { (handler)(ev).await });
            // Reap finished jobs so the set does not grow for the lifetime of the server.
            while let Some(Some(result)) = futures_util::FutureExt::now_or_never(jobs.join_next()) {
                log_job_result(result);
            }
        }
        if !jobs.is_empty() {
            debug!("📬️ Waiting for {} event handler jobs to complete", jobs.len());
        }
        while let Some(result) = jobs.join_next().await {
            log_job_result(result);
        }
        debug!("📬️ Event handler has shut down");
    }
}

fn log_job_result(result: Result<(), tokio::task::JoinError>) {
    match result {
        Ok(()) => trace!("📬️ Event handled"),
        Err(e) => warn!("📬️ An event handler job failed: {e}"),
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(sender: mpsc::Sender<E>) -> Self {
        Self { sender }
    }

    pub async fn publish_event(&self, event: E) {
        if let Err(e) = self.sender.send(event).await {
            error!("📬️ Failed to send event: {e}");
        }
    }
}
