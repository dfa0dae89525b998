use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db::{sqlite::SqliteDatabaseError, traits::InsertWithdrawalResult},
    db_types::{OrderNumber, Points, UserId, Withdrawal},
};

/// Inserts the withdrawal row. This is not atomic with the balance debit: callers must run it inside the same
/// transaction as [`super::balances::try_debit`] and pass `&mut *tx` as the connection argument.
pub async fn insert_withdrawal(
    user_id: &UserId,
    number: &OrderNumber,
    amount: Points,
    conn: &mut SqliteConnection,
) -> Result<InsertWithdrawalResult, SqliteDatabaseError> {
    match sqlx::query_as::<_, Withdrawal>(
        r#"
            INSERT INTO withdrawals (user_id, number, amount) VALUES ($1, $2, $3)
            RETURNING id, user_id, number, amount, processed_at;
        "#,
    )
    .bind(user_id.as_str())
    .bind(number.as_str())
    .bind(amount)
    .fetch_all(conn)
    .await
    .map(|rows| rows.into_iter().next())
    {
        Ok(Some(withdrawal)) => {
            debug!("🗃️ Withdrawal of {amount} against {number} recorded for user {user_id}");
            Ok(InsertWithdrawalResult::Inserted(withdrawal))
        },
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(InsertWithdrawalResult::AlreadyExists),
        Ok(None) => Err(SqliteDatabaseError::QueryError(format!("Inserting withdrawal {number} returned no row"))),
        Err(e) => Err(SqliteDatabaseError::from(e)),
    }
}

/// All withdrawals made by the user, most recent first.
pub async fn fetch_withdrawals_for_user(
    user_id: &UserId,
    conn: &mut SqliteConnection,
) -> Result<Vec<Withdrawal>, SqliteDatabaseError> {
    let withdrawals = sqlx::query_as(
        r#"SELECT id, user_id, number, amount, processed_at
    FROM withdrawals WHERE user_id = $1
    ORDER BY processed_at DESC, id DESC"#,
    )
    .bind(user_id.as_str())
    .fetch_all(conn)
    .await?;
    Ok(withdrawals)
}

/// Sum of all withdrawals made by the user, recomputed from the withdrawal rows.
pub async fn withdrawn_sum_by_user(user_id: &UserId, conn: &mut SqliteConnection) -> Result<Points, SqliteDatabaseError> {
    let total: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(amount), 0) FROM withdrawals WHERE user_id = $1")
        .bind(user_id.as_str())
        .fetch_one(conn)
        .await?;
    Ok(Points::from_hundredths(total))
}
