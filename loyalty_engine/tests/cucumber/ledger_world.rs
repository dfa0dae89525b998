use std::{fmt::Debug, time::Duration};

use cucumber::World;
use log::*;
use loyalty_engine::{
    db_types::Withdrawal,
    events::EventProducers,
    ledger_objects::NewOrderOutcome,
    reconciliation::{shutdown_signal, PollOutcome, ReconciliationError, ShutdownSignal},
    test_utils::{
        prepare_env::{create_database, random_db_path, run_migrations},
        scripted_oracle::ScriptedOracle,
    },
    AccrualPoller,
    LedgerApi,
    LedgerApiError,
    SqliteDatabase,
};
use tokio::sync::watch;

#[derive(Default, Debug, World)]
pub struct LedgerWorld {
    pub system: Option<LoyaltySystem>,
    pub last_upload: Option<Result<NewOrderOutcome, LedgerApiError>>,
    pub last_withdrawal: Option<Result<Withdrawal, LedgerApiError>>,
    pub last_poll: Option<Result<PollOutcome, ReconciliationError>>,
}

pub struct LoyaltySystem {
    pub db_path: String,
    pub api: LedgerApi<SqliteDatabase>,
    pub oracle: ScriptedOracle,
    pub poller: AccrualPoller<SqliteDatabase, ScriptedOracle>,
    // Held so the poller's shutdown signal stays live for the whole scenario.
    _shutdown: watch::Sender<bool>,
}

impl Debug for LoyaltySystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LoyaltySystem ({})", self.db_path)
    }
}

impl LedgerWorld {
    pub fn system(&self) -> &LoyaltySystem {
        self.system.as_ref().expect("Loyalty system not initialised")
    }

    pub fn api(&self) -> &LedgerApi<SqliteDatabase> {
        &self.system().api
    }

    pub fn db(&self) -> &SqliteDatabase {
        self.api().db()
    }
}

impl LoyaltySystem {
    pub async fn new() -> Self {
        let url = prepare_test_env().await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        let oracle = ScriptedOracle::new();
        let (tx, rx): (watch::Sender<bool>, ShutdownSignal) = shutdown_signal();
        let schedule = vec![Duration::from_millis(1); 7];
        let poller = AccrualPoller::new(db.clone(), oracle.clone(), schedule, EventProducers::default(), rx);
        let api = LedgerApi::new(db, EventProducers::default());
        Self { db_path: url, api, oracle, poller, _shutdown: tx }
    }
}

pub async fn prepare_test_env() -> String {
    let path = random_db_path();
    create_database(&path).await;
    run_migrations(&path).await;
    path
}
