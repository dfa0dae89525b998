use crate::db_types::{Order, Withdrawal};

/// Result of an idempotent order upload. Whether an existing order belongs to the same user is for the caller to
/// decide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOrderResult {
    Inserted(Order),
    AlreadyExists(Order),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertWithdrawalResult {
    Inserted(Withdrawal),
    /// A withdrawal against the same order number has already been recorded. Nothing was debited.
    AlreadyExists,
    /// The user's current balance does not cover the amount. Nothing was debited.
    InsufficientFunds,
}
