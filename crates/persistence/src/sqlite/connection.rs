//! Database connection and initialization

use carx_core::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;

/// Database wrapper for SQLite operations
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to database at the given path, creating if necessary
    pub async fn connect(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::DatabaseError(e.to_string()))?;
        }

        let path_str = path.to_string_lossy();
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path_str))
            .map_err(|e| Error::DatabaseError(e.to_string()))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| Error::DatabaseError(e.to_string()))?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Connect to in-memory database (for testing)
    pub async fn connect_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| Error::DatabaseError(e.to_string()))?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_xp (
                user_id TEXT PRIMARY KEY,
                xp INTEGER NOT NULL DEFAULT 0,
                last_daily_login TEXT,
                last_weekly_bonus TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS xp_activities (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                activity TEXT NOT NULL,
                xp_delta INTEGER NOT NULL,
                source_id TEXT,
                source_kind TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_activities_user_created
                ON xp_activities (user_id, created_at);

            CREATE TABLE IF NOT EXISTS rewards (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                achievement_id TEXT NOT NULL,
                reward_type TEXT NOT NULL,
                code TEXT,
                discount_percent INTEGER,
                badge TEXT,
                display_name TEXT,
                template_index INTEGER,
                expires_at TEXT,
                claimed INTEGER NOT NULL DEFAULT 0,
                claimed_at TEXT,
                used INTEGER NOT NULL DEFAULT 0,
                used_at TEXT,
                source_kind TEXT NOT NULL DEFAULT 'level_up',
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_rewards_user_achievement
                ON rewards (user_id, achievement_id);

            CREATE TABLE IF NOT EXISTS exchange_items (
                id TEXT PRIMARY KEY,
                category TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                xp_cost INTEGER NOT NULL,
                discount_percent INTEGER,
                icon TEXT,
                color TEXT,
                active INTEGER NOT NULL DEFAULT 1
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

        // Level-up batches must issue each template at most once even when
        // two XP grants race the same level crossing (idempotent)
        sqlx::query(
            r#"CREATE UNIQUE INDEX IF NOT EXISTS idx_rewards_template_once
               ON rewards (user_id, achievement_id, template_index)
               WHERE template_index IS NOT NULL"#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
