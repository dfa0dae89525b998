use std::{env, fmt::Display, str::FromStr, time::Duration};

use log::*;
use loyalty_common::helpers::{parse_boolean_flag, parse_numeric_setting};
use loyalty_engine::{db_types::ClaimLease, oracle::DEFAULT_ORACLE_TIMEOUT, ReconciliationConfig};

const DEFAULT_LOYALTY_HOST: &str = "127.0.0.1";
const DEFAULT_LOYALTY_PORT: u16 = 8080;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/loyalty.db";
const DEFAULT_ACCRUAL_SYSTEM_ADDRESS: &str = "http://127.0.0.1:8081";
pub const DEFAULT_USER_ID_HEADER: &str = "X-User-Id";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Base address of the external accrual system, e.g. `http://localhost:8081`.
    pub accrual_system_address: String,
    pub oracle_timeout: Duration,
    pub auth: AuthConfig,
    /// When true, the server only serves the API. No orders are reconciled against the accrual system.
    pub disable_reconciliation: bool,
    pub reconciliation: ReconciliationConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_LOYALTY_HOST.to_string(),
            port: DEFAULT_LOYALTY_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            accrual_system_address: DEFAULT_ACCRUAL_SYSTEM_ADDRESS.to_string(),
            oracle_timeout: DEFAULT_ORACLE_TIMEOUT,
            auth: AuthConfig::default(),
            disable_reconciliation: false,
            reconciliation: ReconciliationConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        let host = env::var("LOYALTY_HOST").ok().unwrap_or(defaults.host);
        let port = numeric_setting("LOYALTY_PORT", defaults.port);
        let database_url = env::var("LOYALTY_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ LOYALTY_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}.");
            defaults.database_url
        });
        let accrual_system_address = env::var("LOYALTY_ACCRUAL_SYSTEM_ADDRESS").ok().unwrap_or_else(|| {
            warn!(
                "🪛️ LOYALTY_ACCRUAL_SYSTEM_ADDRESS is not set. Expecting the accrual system at \
                 {DEFAULT_ACCRUAL_SYSTEM_ADDRESS}."
            );
            defaults.accrual_system_address
        });
        let oracle_timeout = Duration::from_millis(numeric_setting(
            "LOYALTY_ORACLE_TIMEOUT_MS",
            defaults.oracle_timeout.as_millis() as u64,
        ));
        let auth = AuthConfig::from_env_or_default();
        let disable_reconciliation = parse_boolean_flag(env::var("LOYALTY_DISABLE_RECONCILIATION").ok(), false);
        if disable_reconciliation {
            warn!("🪛️ Order reconciliation is disabled. Uploaded orders will not be checked against the accrual system.");
        }
        let reconciliation = configure_reconciliation(defaults.reconciliation);
        Self {
            host,
            port,
            database_url,
            accrual_system_address,
            oracle_timeout,
            auth,
            disable_reconciliation,
            reconciliation,
        }
    }
}

fn configure_reconciliation(defaults: ReconciliationConfig) -> ReconciliationConfig {
    let tick_interval = Duration::from_millis(numeric_setting(
        "LOYALTY_CHECK_INTERVAL_MS",
        defaults.tick_interval.as_millis() as u64,
    ));
    let max_in_flight = match numeric_setting("LOYALTY_MAX_IN_FLIGHT_POLLS", defaults.max_in_flight) {
        0 => {
            warn!("🪛️ LOYALTY_MAX_IN_FLIGHT_POLLS must be at least 1. Using 1.");
            1
        },
        n => n,
    };
    let base = Duration::from_secs(numeric_setting("LOYALTY_POLL_COOLDOWN_SECS", defaults.lease.base.as_secs()));
    let lease = ClaimLease { base, cap: defaults.lease.cap.max(base) };
    ReconciliationConfig { tick_interval, max_in_flight, lease, ..defaults }
}

/// Reads a numeric environment variable, falling back to `default` (with a log message) when it is missing or
/// malformed.
fn numeric_setting<T: FromStr + Display + Copy>(name: &str, default: T) -> T {
    match parse_numeric_setting::<T>(env::var(name).ok()) {
        Ok(Some(v)) => v,
        Ok(None) => {
            debug!("🪛️ {name} is not set. Using the default value of {default}.");
            default
        },
        Err(s) => {
            error!("🪛️ {s} is not a valid value for {name}. Using the default, {default}, instead.");
            default
        },
    }
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
/// User identity is established upstream (by a gateway or reverse proxy) and forwarded in a trusted request header.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The name of the header carrying the authenticated user's id.
    pub user_id_header: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { user_id_header: DEFAULT_USER_ID_HEADER.to_string() }
    }
}

impl AuthConfig {
    pub fn from_env_or_default() -> Self {
        match env::var("LOYALTY_USER_ID_HEADER") {
            Ok(s) if !s.trim().is_empty() => Self { user_id_header: s.trim().to_string() },
            _ => {
                info!("🪛️ LOYALTY_USER_ID_HEADER is not set. Reading user ids from {DEFAULT_USER_ID_HEADER}.");
                Self::default()
            },
        }
    }
}
