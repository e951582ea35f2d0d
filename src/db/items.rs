//! Item database operations
//!
//! Items are links inside a collection. They are never hard-deleted;
//! `deleted_at` marks them logically removed while the row (and its
//! version history) stays retrievable.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::Result;

/// Item record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Item {
    pub id: String,
    pub collection_id: String,
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub platform: Option<String>,
    pub created_by: String,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
    /// Raw preview metadata as JSON text
    pub metadata: Option<String>,
}

/// A fully-resolved item ready for insertion
#[derive(Debug, Clone)]
pub struct NewItem {
    pub collection_id: String,
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub platform: Option<String>,
    pub created_by: String,
    pub metadata: Option<serde_json::Value>,
}

/// Fields accepted when updating an item
#[derive(Debug, Clone, Deserialize)]
pub struct ItemUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
}

pub(crate) const ITEM_COLUMNS: &str = "id, collection_id, url, title, description, thumbnail_url, \
     platform, created_by, version, created_at, updated_at, deleted_at, metadata";

/// Item repository
pub struct ItemRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ItemRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch an item by id, including soft-deleted rows
    pub async fn get(&self, id: &str) -> Result<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(item)
    }

    /// Live items in a collection
    pub async fn list_by_collection(&self, collection_id: &str) -> Result<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(&format!(
            r#"
            SELECT {ITEM_COLUMNS} FROM items
            WHERE collection_id = ? AND deleted_at IS NULL
            ORDER BY created_at ASC
            "#
        ))
        .bind(collection_id)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    pub async fn create(&self, new_item: &NewItem) -> Result<Item> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let metadata = new_item
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO items (
                id, collection_id, url, title, description, thumbnail_url,
                platform, created_by, version, created_at, updated_at, metadata
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&new_item.collection_id)
        .bind(&new_item.url)
        .bind(&new_item.title)
        .bind(&new_item.description)
        .bind(&new_item.thumbnail_url)
        .bind(&new_item.platform)
        .bind(&new_item.created_by)
        .bind(&now)
        .bind(&now)
        .bind(&metadata)
        .execute(self.pool)
        .await?;

        Ok(Item {
            id,
            collection_id: new_item.collection_id.clone(),
            url: new_item.url.clone(),
            title: new_item.title.clone(),
            description: new_item.description.clone(),
            thumbnail_url: new_item.thumbnail_url.clone(),
            platform: new_item.platform.clone(),
            created_by: new_item.created_by.clone(),
            version: 0,
            created_at: now.clone(),
            updated_at: now,
            deleted_at: None,
            metadata,
        })
    }

    /// Apply a partial update, bumping the version by one
    pub async fn update(&self, id: &str, data: &ItemUpdate) -> Result<Option<Item>> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"
            UPDATE items
            SET title = COALESCE(?, title),
                description = COALESCE(?, description),
                version = version + 1,
                updated_at = ?
            WHERE id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(&data.title)
        .bind(&data.description)
        .bind(&now)
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get(id).await
    }

    /// Soft-delete an item, bumping the version by one
    pub async fn soft_delete(&self, id: &str) -> Result<bool> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"
            UPDATE items
            SET deleted_at = ?,
                version = version + 1,
                updated_at = ?
            WHERE id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(&now)
        .bind(&now)
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
