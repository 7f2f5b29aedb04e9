//! XP balance persistence operations
//!
//! The balance row is the single logical mutation unit: every change to it
//! goes through one atomic statement so concurrent grants cannot lose
//! updates.

use carx_core::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// Per-user XP balance row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct XpBalanceRow {
    pub user_id: String,
    pub xp: i64,
    pub last_daily_login: Option<DateTime<Utc>>,
    pub last_weekly_bonus: Option<DateTime<Utc>>,
}

/// Find the balance row for a user, lazily creating it with zero XP.
/// The primary key on `user_id` makes concurrent first-touch safe.
pub async fn get_or_create_balance(pool: &SqlitePool, user_id: &str) -> Result<XpBalanceRow> {
    sqlx::query(
        r#"INSERT INTO user_xp (user_id, xp, created_at)
           VALUES (?, 0, ?)
           ON CONFLICT(user_id) DO NOTHING"#,
    )
    .bind(user_id)
    .bind(Utc::now())
    .execute(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    sqlx::query_as::<_, XpBalanceRow>(
        "SELECT user_id, xp, last_daily_login, last_weekly_bonus FROM user_xp WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))
}

/// Atomically apply a delta to the balance and return the new value.
/// The row must already exist.
pub async fn add_xp(pool: &SqlitePool, user_id: &str, delta: i64) -> Result<i64> {
    let row: (i64,) = sqlx::query_as("UPDATE user_xp SET xp = xp + ? WHERE user_id = ? RETURNING xp")
        .bind(delta)
        .bind(user_id)
        .fetch_one(pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(row.0)
}

/// Debit that can never drive the balance negative: the sufficiency check
/// and the subtraction happen in the same statement. Returns the new balance,
/// or None when funds were insufficient at commit time.
pub async fn try_debit_xp(pool: &SqlitePool, user_id: &str, amount: i64) -> Result<Option<i64>> {
    let row: Option<(i64,)> = sqlx::query_as(
        "UPDATE user_xp SET xp = xp - ?1 WHERE user_id = ?2 AND xp >= ?1 RETURNING xp",
    )
    .bind(amount)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(row.map(|r| r.0))
}

/// Compare-and-swap the daily-login stamp. Succeeds only while the stored
/// stamp still equals `previous`, so racing claims resolve to one winner.
pub async fn stamp_daily_login(
    pool: &SqlitePool,
    user_id: &str,
    previous: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE user_xp SET last_daily_login = ? WHERE user_id = ? AND last_daily_login IS ?",
    )
    .bind(now)
    .bind(user_id)
    .bind(previous)
    .execute(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(result.rows_affected() > 0)
}

/// Compare-and-swap the weekly-bonus stamp, same contract as the daily stamp
pub async fn stamp_weekly_bonus(
    pool: &SqlitePool,
    user_id: &str,
    previous: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE user_xp SET last_weekly_bonus = ? WHERE user_id = ? AND last_weekly_bonus IS ?",
    )
    .bind(now)
    .bind(user_id)
    .bind(previous)
    .execute(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(result.rows_affected() > 0)
}
