use thiserror::Error;

use crate::db_types::{InvalidOrderNumber, OrderNumber};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error(transparent)]
    InvalidOrderNumber(#[from] InvalidOrderNumber),
    #[error("Order {0} has already been uploaded by another user")]
    OrderUploadedByAnotherUser(OrderNumber),
    #[error("The withdrawal amount must be positive")]
    NonPositiveAmount,
    #[error("Insufficient funds for this withdrawal")]
    InsufficientFunds,
    #[error("A withdrawal against order {0} already exists")]
    WithdrawalAlreadyExists(OrderNumber),
}

impl LedgerApiError {
    pub fn database<E: std::error::Error>(e: E) -> Self {
        Self::DatabaseError(e.to_string())
    }
}
