use log::*;
use loyalty_engine::{
    events::EventProducers,
    reconciliation::ShutdownSignal,
    HttpAccrualOracle,
    OrderChecker,
    ReconciliationConfig,
    ReconciliationError,
    SqliteDatabase,
};
use tokio::task::JoinHandle;

/// Starts the reconciliation worker. It runs until `shutdown` fires, after which it waits for its in-flight polls to
/// wind down. Await the returned handle after requesting shutdown, never before.
pub fn start_reconciliation_worker(
    db: SqliteDatabase,
    oracle: HttpAccrualOracle,
    config: ReconciliationConfig,
    producers: EventProducers,
    shutdown: ShutdownSignal,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("🕰️ Reconciliation worker started. Accrual system is at {}", oracle.base_url());
        let checker = OrderChecker::new(db, oracle, config, producers, shutdown);
        match checker.run().await {
            Ok(()) | Err(ReconciliationError::Cancelled) => info!("🕰️ Reconciliation worker stopped"),
            Err(e) => error!("🕰️ Reconciliation worker stopped unexpectedly. {e}"),
        }
    })
}
