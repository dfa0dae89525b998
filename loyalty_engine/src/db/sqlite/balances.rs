use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{Balance, Points, UserId},
};

/// Returns the materialised balance for the user. Users that have never been credited have a zero balance.
pub async fn fetch_balance(user_id: &UserId, conn: &mut SqliteConnection) -> Result<Balance, SqliteDatabaseError> {
    let balance = sqlx::query_as::<_, Balance>("SELECT current, withdrawn FROM user_balances WHERE user_id = $1")
        .bind(user_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(balance.unwrap_or_default())
}

/// Adds `amount` to the user's current balance, creating the balance row on first credit.
pub async fn credit(user_id: &UserId, amount: Points, conn: &mut SqliteConnection) -> Result<(), SqliteDatabaseError> {
    sqlx::query(
        r#"
            INSERT INTO user_balances (user_id, current) VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE
            SET current = current + excluded.current, updated_at = CURRENT_TIMESTAMP;
        "#,
    )
    .bind(user_id.as_str())
    .bind(amount)
    .execute(conn)
    .await?;
    trace!("🗃️ Credited {amount} to user {user_id}");
    Ok(())
}

/// Compare-and-set debit: moves `amount` from `current` to `withdrawn` only if `current` covers it. Returns false,
/// changing nothing, when funds are insufficient or the user has no balance row at all.
pub async fn try_debit(user_id: &UserId, amount: Points, conn: &mut SqliteConnection) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query(
        r#"
            UPDATE user_balances
            SET current = current - $1, withdrawn = withdrawn + $2, updated_at = CURRENT_TIMESTAMP
            WHERE user_id = $3 AND current >= $4;
        "#,
    )
    .bind(amount)
    .bind(amount)
    .bind(user_id.as_str())
    .bind(amount)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}
