//! Exchange item catalog operations
//!
//! Read-mostly. Items are soft-removed by flipping `active` off so exchange
//! history keeps pointing at a real row.

use carx_core::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// Catalog row for a redeemable item
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ExchangeItemRow {
    pub id: String,
    pub category: String,
    pub name: String,
    pub description: String,
    pub xp_cost: i64,
    /// Structured percent for DISCOUNT items. Legacy rows leave this NULL
    /// and carry the percent in the description text instead.
    pub discount_percent: Option<i64>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub active: bool,
}

const ITEM_COLUMNS: &str =
    "id, category, name, description, xp_cost, discount_percent, icon, color, active";

/// Number of catalog rows, active or not
pub async fn count_items(pool: &SqlitePool) -> Result<u32> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM exchange_items")
        .fetch_one(pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(row.0 as u32)
}

/// Insert a catalog item; an existing id is left untouched.
/// Returns whether a row was actually inserted.
pub async fn insert_item(pool: &SqlitePool, item: &ExchangeItemRow) -> Result<bool> {
    let result = sqlx::query(
        r#"INSERT INTO exchange_items (id, category, name, description, xp_cost,
                                       discount_percent, icon, color, active)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
           ON CONFLICT(id) DO NOTHING"#,
    )
    .bind(&item.id)
    .bind(&item.category)
    .bind(&item.name)
    .bind(&item.description)
    .bind(item.xp_cost)
    .bind(item.discount_percent)
    .bind(item.icon.as_deref())
    .bind(item.color.as_deref())
    .bind(item.active)
    .execute(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(result.rows_affected() > 0)
}

/// Active catalog items, cheapest first
pub async fn active_items(pool: &SqlitePool) -> Result<Vec<ExchangeItemRow>> {
    sqlx::query_as::<_, ExchangeItemRow>(&format!(
        "SELECT {ITEM_COLUMNS} FROM exchange_items WHERE active = 1 ORDER BY xp_cost, id"
    ))
    .fetch_all(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))
}

/// Look up an item by id, active items only
pub async fn get_active_item(pool: &SqlitePool, item_id: &str) -> Result<Option<ExchangeItemRow>> {
    sqlx::query_as::<_, ExchangeItemRow>(&format!(
        "SELECT {ITEM_COLUMNS} FROM exchange_items WHERE id = ? AND active = 1"
    ))
    .bind(item_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))
}

/// Soft-remove (or restore) an item. Returns whether the item exists.
pub async fn set_item_active(pool: &SqlitePool, item_id: &str, active: bool) -> Result<bool> {
    let result = sqlx::query("UPDATE exchange_items SET active = ? WHERE id = ?")
        .bind(active)
        .bind(item_id)
        .execute(pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(result.rows_affected() > 0)
}
