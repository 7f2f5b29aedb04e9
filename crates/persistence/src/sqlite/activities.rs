//! XP activity history operations
//!
//! Append-only: rows are never updated or deleted. The history feeds the
//! weekly-activity count and serves as an audit trail.

use carx_core::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// One recorded XP activity
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct XpActivityRow {
    pub id: i64,
    pub user_id: String,
    pub activity: String,
    pub xp_delta: i64,
    pub source_id: Option<String>,
    pub source_kind: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Append an activity record
pub async fn log_activity(
    pool: &SqlitePool,
    user_id: &str,
    activity: &str,
    xp_delta: i64,
    source_id: Option<&str>,
    source_kind: Option<&str>,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO xp_activities (user_id, activity, xp_delta, source_id, source_kind, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(activity)
    .bind(xp_delta)
    .bind(source_id)
    .bind(source_kind)
    .bind(Utc::now())
    .execute(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(result.last_insert_rowid())
}

/// Count a user's activities recorded at or after the cutoff
pub async fn count_activities_since(
    pool: &SqlitePool,
    user_id: &str,
    cutoff: DateTime<Utc>,
) -> Result<u32> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM xp_activities WHERE user_id = ? AND created_at >= ?",
    )
    .bind(user_id)
    .bind(cutoff)
    .fetch_one(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(row.0 as u32)
}

/// Most recent activities for a user, newest first
pub async fn recent_activities(
    pool: &SqlitePool,
    user_id: &str,
    limit: u32,
) -> Result<Vec<XpActivityRow>> {
    sqlx::query_as::<_, XpActivityRow>(
        r#"
        SELECT id, user_id, activity, xp_delta, source_id, source_kind, created_at
        FROM xp_activities
        WHERE user_id = ?
        ORDER BY created_at DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))
}
