//! Reward persistence and lifecycle operations
//!
//! Lifecycle: granted (unclaimed) -> claimed -> used, with expiry checked at
//! use time. Transitions are conditional updates so a state can only be left
//! once.

use carx_core::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// Reward record stored in database
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RewardRow {
    pub id: i64,
    pub user_id: String,
    pub achievement_id: String,
    pub reward_type: String,
    pub code: Option<String>,
    pub discount_percent: Option<i64>,
    pub badge: Option<String>,
    pub display_name: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub claimed: bool,
    pub claimed_at: Option<DateTime<Utc>>,
    pub used: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub source_kind: String,
}

const REWARD_COLUMNS: &str = "id, user_id, achievement_id, reward_type, code, discount_percent, \
     badge, display_name, expires_at, claimed, claimed_at, used, used_at, source_kind";

/// Fields for a reward about to be minted
#[derive(Debug, Clone)]
pub struct NewReward<'a> {
    pub user_id: &'a str,
    pub achievement_id: &'a str,
    pub reward_type: &'a str,
    pub code: Option<String>,
    pub discount_percent: Option<i64>,
    pub badge: Option<&'a str>,
    pub display_name: Option<&'a str>,
    /// Position within the level's reward batch; None for exchange rewards.
    /// Participates in the exact-once unique index.
    pub template_index: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
    pub claimed: bool,
    pub claimed_at: Option<DateTime<Utc>>,
    pub source_kind: &'a str,
}

/// Insert a reward. Returns the new row id, or None when the exact-once
/// unique index suppressed a duplicate from a racing level-up.
pub async fn insert_reward(pool: &SqlitePool, reward: &NewReward<'_>) -> Result<Option<i64>> {
    let result = sqlx::query(
        r#"
        INSERT INTO rewards (user_id, achievement_id, reward_type, code, discount_percent,
                             badge, display_name, template_index, expires_at, claimed,
                             claimed_at, source_kind, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(reward.user_id)
    .bind(reward.achievement_id)
    .bind(reward.reward_type)
    .bind(reward.code.as_deref())
    .bind(reward.discount_percent)
    .bind(reward.badge)
    .bind(reward.display_name)
    .bind(reward.template_index)
    .bind(reward.expires_at)
    .bind(reward.claimed)
    .bind(reward.claimed_at)
    .bind(reward.source_kind)
    .bind(Utc::now())
    .execute(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    if result.rows_affected() == 0 {
        Ok(None)
    } else {
        Ok(Some(result.last_insert_rowid()))
    }
}

/// All rewards for a user, claimed or not
pub async fn rewards_for_user(pool: &SqlitePool, user_id: &str) -> Result<Vec<RewardRow>> {
    sqlx::query_as::<_, RewardRow>(&format!(
        "SELECT {REWARD_COLUMNS} FROM rewards WHERE user_id = ?"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))
}

/// Claim every unclaimed reward for an achievement in one statement and
/// return the claimed rows. Re-running yields an empty set, never a
/// duplicate grant.
pub async fn claim_for_achievement(
    pool: &SqlitePool,
    user_id: &str,
    achievement_id: &str,
    now: DateTime<Utc>,
) -> Result<Vec<RewardRow>> {
    sqlx::query_as::<_, RewardRow>(&format!(
        r#"UPDATE rewards SET claimed = 1, claimed_at = ?
           WHERE user_id = ? AND achievement_id = ? AND claimed = 0
           RETURNING {REWARD_COLUMNS}"#
    ))
    .bind(now)
    .bind(user_id)
    .bind(achievement_id)
    .fetch_all(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))
}

/// Claimed rewards for a user, newest claims first
pub async fn claimed_rewards(pool: &SqlitePool, user_id: &str) -> Result<Vec<RewardRow>> {
    sqlx::query_as::<_, RewardRow>(&format!(
        r#"SELECT {REWARD_COLUMNS} FROM rewards
           WHERE user_id = ? AND claimed = 1
           ORDER BY claimed_at DESC, id DESC"#
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))
}

/// Fetch a single reward owned by the user
pub async fn get_reward(
    pool: &SqlitePool,
    user_id: &str,
    reward_id: i64,
) -> Result<Option<RewardRow>> {
    sqlx::query_as::<_, RewardRow>(&format!(
        "SELECT {REWARD_COLUMNS} FROM rewards WHERE id = ? AND user_id = ?"
    ))
    .bind(reward_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))
}

/// Flip a reward to used, once. The guards (ownership, claimed, unused,
/// unexpired) live in the same statement, so a double-use race has exactly
/// one winner. Returns whether the flip happened.
pub async fn mark_used(
    pool: &SqlitePool,
    user_id: &str,
    reward_id: i64,
    now: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"UPDATE rewards SET used = 1, used_at = ?1
           WHERE id = ?2 AND user_id = ?3 AND claimed = 1 AND used = 0
             AND (expires_at IS NULL OR expires_at > ?1)"#,
    )
    .bind(now)
    .bind(reward_id)
    .bind(user_id)
    .execute(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::Database;

    fn badge<'a>(user_id: &'a str, achievement_id: &'a str, index: i64) -> NewReward<'a> {
        NewReward {
            user_id,
            achievement_id,
            reward_type: "BADGE",
            code: None,
            discount_percent: None,
            badge: Some("learner"),
            display_name: None,
            template_index: Some(index),
            expires_at: None,
            claimed: false,
            claimed_at: None,
            source_kind: "level_up",
        }
    }

    #[tokio::test]
    async fn test_duplicate_template_insert_is_suppressed() {
        let db = Database::connect_in_memory().await.unwrap();
        let reward = badge("u1", "level_2", 0);

        assert!(insert_reward(db.pool(), &reward).await.unwrap().is_some());
        assert!(insert_reward(db.pool(), &reward).await.unwrap().is_none());

        let rows = rewards_for_user(db.pool(), "u1").await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_exchange_rewards_skip_the_unique_index() {
        let db = Database::connect_in_memory().await.unwrap();
        let mut reward = badge("u1", "exchange_item", 0);
        reward.template_index = None;
        reward.claimed = true;
        reward.claimed_at = Some(Utc::now());
        reward.source_kind = "exchange";

        assert!(insert_reward(db.pool(), &reward).await.unwrap().is_some());
        assert!(insert_reward(db.pool(), &reward).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_claim_is_one_shot() {
        let db = Database::connect_in_memory().await.unwrap();
        insert_reward(db.pool(), &badge("u1", "level_2", 0)).await.unwrap();

        let claimed = claim_for_achievement(db.pool(), "u1", "level_2", Utc::now())
            .await
            .unwrap();
        assert_eq!(claimed.len(), 1);
        assert!(claimed[0].claimed);

        let again = claim_for_achievement(db.pool(), "u1", "level_2", Utc::now())
            .await
            .unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn test_mark_used_guards() {
        let db = Database::connect_in_memory().await.unwrap();
        let now = Utc::now();

        let mut reward = badge("u1", "level_2", 0);
        reward.claimed = true;
        reward.claimed_at = Some(now);
        let id = insert_reward(db.pool(), &reward).await.unwrap().unwrap();

        // Wrong owner
        assert!(!mark_used(db.pool(), "someone_else", id, now).await.unwrap());
        // First use succeeds, second does not
        assert!(mark_used(db.pool(), "u1", id, now).await.unwrap());
        assert!(!mark_used(db.pool(), "u1", id, now).await.unwrap());

        // Expired reward cannot be used
        let mut expired = badge("u1", "level_3", 0);
        expired.claimed = true;
        expired.claimed_at = Some(now);
        expired.expires_at = Some(now - chrono::Duration::days(1));
        let expired_id = insert_reward(db.pool(), &expired).await.unwrap().unwrap();
        assert!(!mark_used(db.pool(), "u1", expired_id, now).await.unwrap());

        // Unclaimed reward cannot be used
        let unclaimed_id = insert_reward(db.pool(), &badge("u1", "level_4", 0))
            .await
            .unwrap()
            .unwrap();
        assert!(!mark_used(db.pool(), "u1", unclaimed_id, now).await.unwrap());
    }
}
