use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db::{sqlite::SqliteDatabaseError, traits::InsertOrderResult},
    db_types::{ClaimLease, Order, OrderNumber, OrderStatusType, Points, UserId},
};

const ORDER_COLUMNS: &str = "id, user_id, number, status, accrual, poll_attempts, created_at, updated_at";

/// Inserts a new order for `user_id`, relying on the unique constraint on `number` to detect duplicates. When the
/// number already exists, the existing row is returned untouched, whoever owns it.
pub async fn idempotent_insert(
    user_id: &UserId,
    number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<InsertOrderResult, SqliteDatabaseError> {
    let inserted = sqlx::query_as::<_, Order>(
        r#"
            INSERT INTO orders (user_id, number) VALUES ($1, $2)
            RETURNING id, user_id, number, status, accrual, poll_attempts, created_at, updated_at;
        "#,
    )
    .bind(user_id.as_str())
    .bind(number.as_str())
    .fetch_all(&mut *conn)
    .await
    .map(|rows| rows.into_iter().next());
    match inserted {
        Ok(Some(order)) => {
            debug!("🗃️ Order {number} saved for user {user_id} with id {}", order.id);
            Ok(InsertOrderResult::Inserted(order))
        },
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            trace!("🗃️ Order {number} already exists");
            let existing = fetch_order_by_number(number, conn)
                .await?
                .ok_or_else(|| SqliteDatabaseError::QueryError(format!("Order {number} vanished after a conflict")))?;
            Ok(InsertOrderResult::AlreadyExists(existing))
        },
        Ok(None) => Err(SqliteDatabaseError::QueryError(format!("Inserting order {number} returned no row"))),
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_order_by_number(
    number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SqliteDatabaseError> {
    let order = sqlx::query_as::<_, Order>(
        r#"
            SELECT id, user_id, number, status, accrual, poll_attempts, created_at, updated_at
            FROM orders
            WHERE number = $1;
        "#,
    )
    .bind(number.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

#[derive(Debug, Clone, Default)]
pub struct OrderQueryFilter {
    user_id: Option<UserId>,
    statuses: Vec<OrderStatusType>,
    newest_first: bool,
    limit: Option<i64>,
}

impl OrderQueryFilter {
    pub fn with_user_id(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn newest_first(mut self) -> Self {
        self.newest_first = true;
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.user_id.is_none() && self.statuses.is_empty()
    }
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`
///
/// Orders come back in upload order (`created_at`, then `id`), or the reverse if `newest_first` was requested.
pub async fn fetch_orders(
    query: OrderQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, SqliteDatabaseError> {
    let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {ORDER_COLUMNS} FROM orders "));
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(user_id) = query.user_id {
        where_clause.push("user_id = ");
        where_clause.push_bind_unseparated(user_id);
    }
    if !query.statuses.is_empty() {
        where_clause.push("status IN (");
        for (i, status) in query.statuses.into_iter().enumerate() {
            if i > 0 {
                where_clause.push_unseparated(", ");
            }
            where_clause.push_bind_unseparated(status);
        }
        where_clause.push_unseparated(")");
    }
    if query.newest_first {
        builder.push(" ORDER BY created_at DESC, id DESC");
    } else {
        builder.push(" ORDER BY created_at ASC, id ASC");
    }
    if let Some(limit) = query.limit {
        builder.push(" LIMIT ");
        builder.push_bind(limit);
    }

    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("🗃️ Result of fetch_orders: {}", orders.len());
    Ok(orders)
}

/// Atomically picks the oldest pending order whose cooldown has expired, bumps its attempt counter and pushes its
/// `next_poll_at` forward by the lease cooldown for that attempt.
///
/// The selection and the update happen in one statement, so two schedulers can never claim the same order in the same
/// lease window. `RETURNING` rows are always drained with `fetch_all`: sqlite only finishes (and autocommits) the
/// statement once it has been stepped to completion.
pub async fn claim_pending_order(
    now: DateTime<Utc>,
    lease: &ClaimLease,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SqliteDatabaseError> {
    let now_ms = now.timestamp_millis();
    let base_ms = i64::try_from(lease.base.as_millis()).unwrap_or(i64::MAX);
    let cap_ms = i64::try_from(lease.cap.as_millis()).unwrap_or(i64::MAX);
    let order = sqlx::query_as::<_, Order>(
        r#"
            UPDATE orders
            SET poll_attempts = poll_attempts + 1,
                next_poll_at = $1 + min($2 << min(poll_attempts, 20), $3)
            WHERE id = (
                SELECT id FROM orders
                WHERE status IN ('NEW', 'PROCESSING') AND next_poll_at <= $4
                ORDER BY created_at ASC, id ASC
                LIMIT 1
            )
            RETURNING id, user_id, number, status, accrual, poll_attempts, created_at, updated_at;
        "#,
    )
    .bind(now_ms)
    .bind(base_ms)
    .bind(cap_ms)
    .bind(now_ms)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next();
    if let Some(order) = &order {
        trace!("🗃️ Claimed order {} (attempt {})", order.number, order.poll_attempts);
    }
    Ok(order)
}

/// Moves an order from `New` to `Processing`. Returns false if the order was in any other state.
pub async fn mark_processing(number: &OrderNumber, conn: &mut SqliteConnection) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query(
        "UPDATE orders SET status = 'PROCESSING', updated_at = CURRENT_TIMESTAMP WHERE number = $1 AND status = 'NEW'",
    )
    .bind(number.as_str())
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Writes a terminal status and accrual for a pending order. Orders that are already terminal are left untouched and
/// `None` is returned.
pub(crate) async fn set_terminal_status(
    number: &OrderNumber,
    status: OrderStatusType,
    accrual: Points,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SqliteDatabaseError> {
    if !status.is_terminal() {
        return Err(SqliteDatabaseError::InvalidTerminalStatus(status));
    }
    let order = sqlx::query_as::<_, Order>(
        r#"
            UPDATE orders
            SET status = $1, accrual = $2, updated_at = CURRENT_TIMESTAMP
            WHERE number = $3 AND status IN ('NEW', 'PROCESSING')
            RETURNING id, user_id, number, status, accrual, poll_attempts, created_at, updated_at;
        "#,
    )
    .bind(status)
    .bind(accrual)
    .bind(number.as_str())
    .fetch_all(conn)
    .await?
    .into_iter()
    .next();
    Ok(order)
}

/// Sum of all accruals credited to the user, recomputed from the order rows.
pub async fn credited_sum_by_user(user_id: &UserId, conn: &mut SqliteConnection) -> Result<Points, SqliteDatabaseError> {
    let total: i64 =
        sqlx::query_scalar("SELECT COALESCE(SUM(accrual), 0) FROM orders WHERE user_id = $1 AND status = 'PROCESSED'")
            .bind(user_id.as_str())
            .fetch_one(conn)
            .await?;
    Ok(Points::from_hundredths(total))
}
