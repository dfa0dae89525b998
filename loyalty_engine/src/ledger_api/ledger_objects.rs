//! External representations of ledger records, as served to users.
use chrono::{DateTime, Utc};
use loyalty_common::Points;
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderStatusType, Withdrawal};

/// Outcome of a successful order upload. Both variants are successes: the caller decides how to report them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewOrderOutcome {
    /// The order was created in the `New` state.
    Created(Order),
    /// The same user had already uploaded this order. Nothing changed.
    AlreadyUploaded(Order),
}

impl NewOrderOutcome {
    pub fn order(&self) -> &Order {
        match self {
            Self::Created(order) | Self::AlreadyUploaded(order) => order,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResponse {
    pub number: String,
    pub status: OrderStatusType,
    /// Only present for `processed` orders that earned points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accrual: Option<Points>,
    pub uploaded_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        let accrual =
            (order.status == OrderStatusType::Processed && order.accrual.is_positive()).then_some(order.accrual);
        Self { number: order.number.as_str().to_string(), status: order.status, accrual, uploaded_at: order.created_at }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalResponse {
    pub order: String,
    pub sum: Points,
    pub processed_at: DateTime<Utc>,
}

impl From<Withdrawal> for WithdrawalResponse {
    fn from(w: Withdrawal) -> Self {
        Self { order: w.number.as_str().to_string(), sum: w.amount, processed_at: w.processed_at }
    }
}

/// Comparison of the materialised balance against balances recomputed from the order and withdrawal rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BalanceAudit {
    pub materialised_current: Points,
    pub materialised_withdrawn: Points,
    pub credited: Points,
    pub withdrawn: Points,
}

impl BalanceAudit {
    /// The current balance implied by the ledger rows.
    pub fn expected_current(&self) -> Points {
        self.credited - self.withdrawn
    }

    pub fn is_consistent(&self) -> bool {
        self.materialised_current == self.expected_current() && self.materialised_withdrawn == self.withdrawn
    }
}
