use std::future::Future;

use crate::db_types::{Order, OrderNumber, OrderStatusType, UserId};

/// The `OrderManagement` trait defines the behaviour for querying information about orders in the database backend.
pub trait OrderManagement {
    type Error: std::error::Error + Send + Sync + 'static;

    fn fetch_order_by_number(
        &self,
        number: &OrderNumber,
    ) -> impl Future<Output = Result<Option<Order>, Self::Error>> + Send;

    /// Fetches the oldest order (by upload time, then id) with the given status.
    fn fetch_one_order_with_status(
        &self,
        status: OrderStatusType,
    ) -> impl Future<Output = Result<Option<Order>, Self::Error>> + Send;

    /// Fetches all the orders uploaded by the user, newest first.
    fn fetch_orders_for_user(&self, user_id: &UserId) -> impl Future<Output = Result<Vec<Order>, Self::Error>> + Send;
}
