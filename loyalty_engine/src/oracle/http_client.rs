use std::{sync::Arc, time::Duration};

use log::*;
use reqwest::{header::RETRY_AFTER, Client, StatusCode};

use crate::{
    db_types::OrderNumber,
    oracle::{AccrualOracle, OracleError, Verdict},
};

pub const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(3);

/// [`AccrualOracle`] over the oracle's REST API: `GET {base}/api/orders/{number}`.
///
/// * `200` carries a JSON [`Verdict`].
/// * `204` means the oracle has not registered the order yet.
/// * `429` means we are being rate limited. It is logged (with `Retry-After`, if given) and treated as "no verdict".
/// * Any other status is treated as "no verdict".
///
/// Points are kept in hundredths. A verdict whose accrual has more than two decimal places cannot be credited exactly
/// and is reported as [`OracleError::MalformedResponse`]. The order stays pending.
#[derive(Debug, Clone)]
pub struct HttpAccrualOracle {
    base_url: String,
    client: Arc<Client>,
}

impl HttpAccrualOracle {
    /// Creates a client for the oracle at `address`. The address may omit the scheme (`localhost:8081`), in which case
    /// plain HTTP is assumed.
    pub fn new(address: &str, timeout: Duration) -> Result<Self, OracleError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| OracleError::Initialization(e.to_string()))?;
        Ok(Self { base_url: normalize_base_url(address), client: Arc::new(client) })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, number: &OrderNumber) -> String {
        format!("{}/api/orders/{}", self.base_url, number.as_str())
    }
}

impl AccrualOracle for HttpAccrualOracle {
    async fn fetch_verdict(&self, number: &OrderNumber) -> Result<Option<Verdict>, OracleError> {
        let url = self.url(number);
        trace!("🔮️ Asking the accrual oracle about {number}: {url}");
        let response = self.client.get(&url).send().await.map_err(|e| OracleError::Unreachable(e.to_string()))?;
        match response.status() {
            StatusCode::OK => {
                let body = response.text().await.map_err(|e| OracleError::Unreachable(e.to_string()))?;
                let verdict = serde_json::from_str::<Verdict>(&body)
                    .map_err(|e| OracleError::MalformedResponse(format!("{e}. Body: {body}")))?;
                if verdict.order != number.as_str() {
                    return Err(OracleError::MalformedResponse(format!(
                        "asked about {number} but got a verdict for {}",
                        verdict.order
                    )));
                }
                debug!("🔮️ Oracle verdict for {number}: {:?}", verdict.status);
                Ok(Some(verdict))
            },
            StatusCode::NO_CONTENT => {
                debug!("🔮️ The accrual oracle does not know about {number} yet");
                Ok(None)
            },
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .map(|v| format!("{v}s"))
                    .unwrap_or_else(|| "unspecified".to_string());
                warn!("🔮️ The accrual oracle is rate limiting us. Retry after: {retry_after}");
                Ok(None)
            },
            status => {
                warn!("🔮️ Unexpected response from the accrual oracle for {number}: {status}");
                Ok(None)
            },
        }
    }
}

fn normalize_base_url(address: &str) -> String {
    let address = address.trim().trim_end_matches('/');
    if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{address}")
    }
}
