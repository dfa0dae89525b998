use serde::Serialize;

use crate::db_types::{Order, Withdrawal};

/// An order reached `Processed` and its accrual was credited to the owner's balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderAccruedEvent {
    pub order: Order,
}

impl OrderAccruedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// The oracle rejected an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderInvalidatedEvent {
    pub order: Order,
}

impl OrderInvalidatedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalProcessedEvent {
    pub withdrawal: Withdrawal,
}

impl WithdrawalProcessedEvent {
    pub fn new(withdrawal: Withdrawal) -> Self {
        Self { withdrawal }
    }
}

/// A flattened, serialisable view of any ledger event, convenient for audit logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEventSummary {
    OrderAccrued { user_id: String, number: String, accrual: loyalty_common::Points },
    OrderInvalidated { user_id: String, number: String },
    WithdrawalProcessed { user_id: String, number: String, sum: loyalty_common::Points },
}

impl From<&OrderAccruedEvent> for LedgerEventSummary {
    fn from(ev: &OrderAccruedEvent) -> Self {
        Self::OrderAccrued {
            user_id: ev.order.user_id.to_string(),
            number: ev.order.number.as_str().to_string(),
            accrual: ev.order.accrual,
        }
    }
}

impl From<&OrderInvalidatedEvent> for LedgerEventSummary {
    fn from(ev: &OrderInvalidatedEvent) -> Self {
        Self::OrderInvalidated { user_id: ev.order.user_id.to_string(), number: ev.order.number.as_str().to_string() }
    }
}

impl From<&WithdrawalProcessedEvent> for LedgerEventSummary {
    fn from(ev: &WithdrawalProcessedEvent) -> Self {
        Self::WithdrawalProcessed {
            user_id: ev.withdrawal.user_id.to_string(),
            number: ev.withdrawal.number.as_str().to_string(),
            sum: ev.withdrawal.amount,
        }
    }
}
