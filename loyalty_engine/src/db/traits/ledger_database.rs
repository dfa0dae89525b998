use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
    db::traits::{InsertOrderResult, InsertWithdrawalResult},
    db_types::{ClaimLease, Order, OrderNumber, OrderStatusType, Points, UserId},
};

/// The state-changing half of the ledger store.
pub trait LedgerDatabase: Clone + Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// The URL of the database
    fn url(&self) -> &str;

    /// Creates a `New` order for the user, unless the number is already taken. Uniqueness is enforced by the store, so
    /// two concurrent uploads of the same number produce exactly one row.
    fn create_order_if_absent(
        &self,
        user_id: &UserId,
        number: &OrderNumber,
    ) -> impl Future<Output = Result<InsertOrderResult, Self::Error>> + Send;

    /// Claims the oldest pending (`New` or `Processing`) order whose cooldown has passed at `now`.
    ///
    /// In one atomic step the order's attempt counter is incremented and it is hidden from discovery for the lease
    /// cooldown, so an order that is being polled is not handed out again.
    fn claim_pending_order(
        &self,
        now: DateTime<Utc>,
        lease: &ClaimLease,
    ) -> impl Future<Output = Result<Option<Order>, Self::Error>> + Send;

    /// Moves an order from `New` to `Processing`. Returns false (and changes nothing) for orders in any other state.
    fn mark_order_processing(&self, number: &OrderNumber) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Applies a terminal verdict to a pending order.
    ///
    /// For `Processed`, the accrual is written and credited to the owner's balance in the same transaction. For
    /// `Invalid`, the accrual is forced to zero. The update only applies to orders that are still `New` or
    /// `Processing`: if the order is already terminal (or does not exist) nothing changes and `None` is returned.
    /// Otherwise the updated order is returned.
    fn update_order_terminal(
        &self,
        number: &OrderNumber,
        status: OrderStatusType,
        accrual: Points,
    ) -> impl Future<Output = Result<Option<Order>, Self::Error>> + Send;

    /// In a single transaction, debits `amount` from the user's current balance if it is covered, and records the
    /// withdrawal. Either both happen or neither does.
    fn insert_withdrawal(
        &self,
        user_id: &UserId,
        number: &OrderNumber,
        amount: Points,
    ) -> impl Future<Output = Result<InsertWithdrawalResult, Self::Error>> + Send;

    /// Closes the database connection.
    fn close(&mut self) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
