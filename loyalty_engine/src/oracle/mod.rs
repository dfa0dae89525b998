//! Accrual oracle client.
//!
//! The accrual oracle is an independently operated service that decides how many points an order earns. The engine
//! only ever asks it one question: "what is your current verdict on this order number?". The [`AccrualOracle`] trait is
//! that question. It is a pure adapter: retries, backoff and cancellation belong to the
//! [`crate::reconciliation::AccrualPoller`].
mod errors;
mod http_client;

use std::future::Future;

pub use errors::OracleError;
pub use http_client::{HttpAccrualOracle, DEFAULT_ORACLE_TIMEOUT};
use loyalty_common::Points;
use serde::{Deserialize, Serialize};

use crate::db_types::OrderNumber;

/// The status an oracle reports for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OracleStatus {
    /// The oracle has registered the order but has not started on it.
    Registered,
    /// The oracle is working on the order.
    Processing,
    /// Terminal. The order earns `accrual` points.
    Processed,
    /// Terminal. The order earns nothing.
    Invalid,
}

impl OracleStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Processed | Self::Invalid)
    }
}

/// The oracle's current verdict on one order.
///
/// Oracles spell the fields either `{order, status, accrual}` or `{number, status, amount}`. Both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    #[serde(alias = "number")]
    pub order: String,
    pub status: OracleStatus,
    /// Only present when `status` is `Processed`.
    #[serde(default, alias = "amount", skip_serializing_if = "Option::is_none")]
    pub accrual: Option<Points>,
}

impl Verdict {
    pub fn processed(number: &OrderNumber, accrual: Points) -> Self {
        Self { order: number.as_str().to_string(), status: OracleStatus::Processed, accrual: Some(accrual) }
    }

    pub fn with_status(number: &OrderNumber, status: OracleStatus) -> Self {
        Self { order: number.as_str().to_string(), status, accrual: None }
    }
}

pub trait AccrualOracle: Clone + Send + Sync + 'static {
    /// Asks the oracle for its verdict on `number`.
    ///
    /// `Ok(None)` means the oracle has no verdict yet (the order is unknown to it, or it asked us to back off). An
    /// `Err` means the oracle could not be reached or answered with something that is not a verdict.
    fn fetch_verdict(&self, number: &OrderNumber) -> impl Future<Output = Result<Option<Verdict>, OracleError>> + Send;
}
