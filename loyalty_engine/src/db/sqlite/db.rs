use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqlitePool;

use super::{balances, db_url, new_pool, orders, run_migrations, withdrawals, SqliteDatabaseError};
use crate::{
    db::{
        sqlite::orders::OrderQueryFilter,
        traits::{BalanceManagement, InsertOrderResult, InsertWithdrawalResult, LedgerDatabase, OrderManagement},
    },
    db_types::{Balance, ClaimLease, Order, OrderNumber, OrderStatusType, Points, UserId, Withdrawal},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `LOYALTY_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    /// Creates a new database API object
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    /// Brings the schema up to date. Safe to call on every start-up.
    pub async fn migrate(&self) -> Result<(), SqliteDatabaseError> {
        run_migrations(&self.pool).await
    }

    /// Returns a reference to the database connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl LedgerDatabase for SqliteDatabase {
    type Error = SqliteDatabaseError;

    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn create_order_if_absent(
        &self,
        user_id: &UserId,
        number: &OrderNumber,
    ) -> Result<InsertOrderResult, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        orders::idempotent_insert(user_id, number, &mut conn).await
    }

    async fn claim_pending_order(&self, now: DateTime<Utc>, lease: &ClaimLease) -> Result<Option<Order>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        orders::claim_pending_order(now, lease, &mut conn).await
    }

    async fn mark_order_processing(&self, number: &OrderNumber) -> Result<bool, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        orders::mark_processing(number, &mut conn).await
    }

    async fn update_order_terminal(
        &self,
        number: &OrderNumber,
        status: OrderStatusType,
        accrual: Points,
    ) -> Result<Option<Order>, Self::Error> {
        let accrual = match status {
            OrderStatusType::Processed => accrual,
            _ => Points::ZERO,
        };
        let mut tx = self.pool.begin().await?;
        let Some(order) = orders::set_terminal_status(number, status, accrual, &mut tx).await? else {
            debug!("🗃️ Order {number} is not pending. The {status} verdict was not applied.");
            return Ok(None);
        };
        if order.status == OrderStatusType::Processed && order.accrual.is_positive() {
            balances::credit(&order.user_id, order.accrual, &mut tx).await?;
        }
        tx.commit().await?;
        debug!("🗃️ Order {number} is now {status} with an accrual of {}", order.accrual);
        Ok(Some(order))
    }

    async fn insert_withdrawal(
        &self,
        user_id: &UserId,
        number: &OrderNumber,
        amount: Points,
    ) -> Result<InsertWithdrawalResult, Self::Error> {
        let mut tx = self.pool.begin().await?;
        // The debit goes first so that the transaction takes the write lock before anything is read.
        if !balances::try_debit(user_id, amount, &mut tx).await? {
            debug!("🗃️ User {user_id} cannot cover a withdrawal of {amount}");
            return Ok(InsertWithdrawalResult::InsufficientFunds);
        }
        let result = withdrawals::insert_withdrawal(user_id, number, amount, &mut tx).await?;
        match result {
            InsertWithdrawalResult::Inserted(_) => tx.commit().await?,
            _ => {
                debug!("🗃️ A withdrawal against {number} already exists. Rolling back the debit.");
                tx.rollback().await?
            },
        }
        Ok(result)
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        self.pool.close().await;
        Ok(())
    }
}

impl OrderManagement for SqliteDatabase {
    type Error = SqliteDatabaseError;

    async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_number(number, &mut conn).await
    }

    async fn fetch_one_order_with_status(&self, status: OrderStatusType) -> Result<Option<Order>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let query = OrderQueryFilter::default().with_status(status).with_limit(1);
        let orders = orders::fetch_orders(query, &mut conn).await?;
        Ok(orders.into_iter().next())
    }

    async fn fetch_orders_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let query = OrderQueryFilter::default().with_user_id(user_id.clone()).newest_first();
        orders::fetch_orders(query, &mut conn).await
    }
}

impl BalanceManagement for SqliteDatabase {
    type Error = SqliteDatabaseError;

    async fn fetch_balance(&self, user_id: &UserId) -> Result<Balance, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        balances::fetch_balance(user_id, &mut conn).await
    }

    async fn credited_sum_by_user(&self, user_id: &UserId) -> Result<Points, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        orders::credited_sum_by_user(user_id, &mut conn).await
    }

    async fn withdrawn_sum_by_user(&self, user_id: &UserId) -> Result<Points, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        withdrawals::withdrawn_sum_by_user(user_id, &mut conn).await
    }

    async fn fetch_withdrawals_for_user(&self, user_id: &UserId) -> Result<Vec<Withdrawal>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        withdrawals::fetch_withdrawals_for_user(user_id, &mut conn).await
    }
}
