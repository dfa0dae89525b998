use std::future::Future;

use crate::db_types::{Balance, Points, UserId, Withdrawal};

/// Queries over user balances and withdrawals.
pub trait BalanceManagement {
    type Error: std::error::Error + Send + Sync + 'static;

    /// The materialised balance. Users without any activity have a zero balance.
    fn fetch_balance(&self, user_id: &UserId) -> impl Future<Output = Result<Balance, Self::Error>> + Send;

    /// The sum of accruals over the user's `Processed` orders, computed from the order rows.
    fn credited_sum_by_user(&self, user_id: &UserId) -> impl Future<Output = Result<Points, Self::Error>> + Send;

    /// The sum of the user's withdrawals, computed from the withdrawal rows.
    fn withdrawn_sum_by_user(&self, user_id: &UserId) -> impl Future<Output = Result<Points, Self::Error>> + Send;

    /// All the user's withdrawals, newest first.
    fn fetch_withdrawals_for_user(
        &self,
        user_id: &UserId,
    ) -> impl Future<Output = Result<Vec<Withdrawal>, Self::Error>> + Send;
}
