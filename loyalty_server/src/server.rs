use std::time::Duration;

use actix_web::{
    dev::Server,
    error::InternalError,
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpResponse,
    HttpServer,
    Scope,
};
use futures::FutureExt;
use log::*;
use loyalty_engine::{
    events::{EventHandlers, EventHooks, EventProducers, LedgerEventSummary},
    reconciliation::shutdown_signal,
    BalanceManagement,
    HttpAccrualOracle,
    LedgerApi,
    LedgerDatabase,
    OrderManagement,
    SqliteDatabase,
};

use crate::{
    config::ServerConfig,
    data_objects::JsonResponse,
    errors::ServerError,
    reconciliation_worker::start_reconciliation_worker,
    routes::{health, MyBalanceRoute, MyOrdersRoute, MyWithdrawalsRoute, UploadOrderRoute, WithdrawRoute},
};

const EVENT_BUFFER_SIZE: usize = 128;
pub const AUDIT_LOG_TARGET: &str = "loyalty::audit";

/// Runs the HTTP server and, unless disabled, the reconciliation worker next to it. When the HTTP server stops (e.g.
/// on Ctrl-C) the worker is cancelled and awaited before this function returns.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Could not migrate the database. {e}")))?;
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, audit_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let (shutdown_tx, shutdown_rx) = shutdown_signal();
    let worker = if config.disable_reconciliation {
        info!("🕰️ Reconciliation is disabled. Orders will stay pending until another instance reconciles them.");
        None
    } else {
        let oracle = HttpAccrualOracle::new(&config.accrual_system_address, config.oracle_timeout)?;
        let worker = start_reconciliation_worker(
            db.clone(),
            oracle,
            config.reconciliation.clone(),
            producers.clone(),
            shutdown_rx,
        );
        Some(worker)
    };

    let srv = create_server_instance(config, db, producers)?;
    let result = srv.await.map_err(|e| ServerError::Unspecified(e.to_string()));
    info!("💻️ HTTP server has stopped");
    if let Some(worker) = worker {
        if shutdown_tx.send(true).is_err() {
            warn!("🕰️ The reconciliation worker had already stopped");
        }
        if let Err(e) = worker.await {
            error!("🕰️ The reconciliation worker did not shut down cleanly. {e}");
        }
    }
    result
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let auth_config = config.auth.clone();
    let srv = HttpServer::new(move || {
        let ledger_api = LedgerApi::new(db.clone(), producers.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("loyalty::access_log"))
            .app_data(web::Data::new(ledger_api))
            .app_data(web::Data::new(auth_config.clone()))
            .app_data(json_config())
            .service(health)
            .service(api_scope::<SqliteDatabase>())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// The user-facing API. Every route expects the authenticated user's id in the configured header.
pub fn api_scope<B>() -> Scope
where B: LedgerDatabase + OrderManagement + BalanceManagement + 'static {
    web::scope("/api")
        .service(UploadOrderRoute::<B>::new())
        .service(MyOrdersRoute::<B>::new())
        .service(MyBalanceRoute::<B>::new())
        .service(WithdrawRoute::<B>::new())
        .service(MyWithdrawalsRoute::<B>::new())
}

/// Malformed JSON bodies are answered with `400 Bad Request` and a [`JsonResponse`] describing the problem.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        debug!("💻️ Could not deserialize the request body. {err}");
        let response = HttpResponse::BadRequest().json(JsonResponse::failure(&err));
        InternalError::from_response(err, response).into()
    })
}

/// Hooks that write every ledger event to the audit log target as a JSON line.
pub fn audit_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_order_accrued(|ev| log_event(LedgerEventSummary::from(&ev)).boxed())
        .on_order_invalidated(|ev| log_event(LedgerEventSummary::from(&ev)).boxed())
        .on_withdrawal_processed(|ev| log_event(LedgerEventSummary::from(&ev)).boxed());
    hooks
}

async fn log_event(summary: LedgerEventSummary) {
    match serde_json::to_string(&summary) {
        Ok(json) => info!(target: AUDIT_LOG_TARGET, "{json}"),
        Err(e) => warn!("📬️ Could not serialize ledger event {summary:?}. {e}"),
    }
}
