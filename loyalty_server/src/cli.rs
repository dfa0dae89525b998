use std::{env, env::VarError};

use clap::Parser;
use log::*;

use crate::{config::ServerConfig, errors::ServerError};

/// Loyalty points accrual server.
///
/// Every option can also be set through the environment (see `--show-env`). Command-line values take precedence.
#[derive(Parser, Debug, Default)]
#[command(version, about)]
pub struct Arguments {
    /// The address to listen on, as `host:port`
    #[arg(short = 'a', long = "address")]
    pub address: Option<String>,
    /// The database URL, e.g. `sqlite://data/loyalty.db`
    #[arg(short = 'd', long = "database")]
    pub database_url: Option<String>,
    /// The base address of the accrual system
    #[arg(short = 'r', long = "accrual-address")]
    pub accrual_system_address: Option<String>,
    /// Print the recognised environment variables and their current values, then exit
    #[arg(long = "show-env")]
    pub show_env: bool,
}

impl Arguments {
    /// Overrides the environment-derived configuration with whatever was given on the command line.
    pub fn apply_to(self, config: &mut ServerConfig) -> Result<(), ServerError> {
        if let Some(address) = self.address {
            let (host, port) = split_address(&address)?;
            info!("🪛️ Listening address overridden on the command line: {host}:{port}");
            config.host = host;
            config.port = port;
        }
        if let Some(url) = self.database_url {
            config.database_url = url;
        }
        if let Some(address) = self.accrual_system_address {
            config.accrual_system_address = address;
        }
        Ok(())
    }
}

/// Splits `host:port` (or `:port`, which listens on all interfaces).
fn split_address(address: &str) -> Result<(String, u16), ServerError> {
    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| ServerError::ConfigurationError(format!("{address} is not a valid host:port address")))?;
    let port = port
        .parse::<u16>()
        .map_err(|e| ServerError::ConfigurationError(format!("{port} is not a valid port in {address}. {e}")))?;
    let host = match host.trim_start_matches('[').trim_end_matches(']') {
        "" => "0.0.0.0".to_string(),
        h => h.to_string(),
    };
    Ok((host, port))
}

pub fn display_envs() {
    const DISPLAY_ENVS: [&str; 11] = [
        "RUST_LOG",
        "LOYALTY_HOST",
        "LOYALTY_PORT",
        "LOYALTY_DATABASE_URL",
        "LOYALTY_ACCRUAL_SYSTEM_ADDRESS",
        "LOYALTY_USER_ID_HEADER",
        "LOYALTY_CHECK_INTERVAL_MS",
        "LOYALTY_MAX_IN_FLIGHT_POLLS",
        "LOYALTY_ORACLE_TIMEOUT_MS",
        "LOYALTY_POLL_COOLDOWN_SECS",
        "LOYALTY_DISABLE_RECONCILIATION",
    ];

    println!("Current environment values:");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
