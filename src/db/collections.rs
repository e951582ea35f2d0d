//! Collection database operations

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::Result;

/// Collection record
///
/// `version` starts at 0 and increments by exactly 1 per accepted
/// mutation; it is the optimistic-concurrency fencing token for sync.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Collection {
    pub id: String,
    pub connection_id: String,
    pub name: String,
    pub icon: Option<String>,
    pub created_by: String,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields accepted when creating a collection
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionCreate {
    pub name: String,
    pub icon: Option<String>,
}

/// Fields accepted when updating a collection
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionUpdate {
    pub name: Option<String>,
    pub icon: Option<String>,
}

const COLLECTION_COLUMNS: &str =
    "id, connection_id, name, icon, created_by, version, created_at, updated_at";

/// Collection repository
pub struct CollectionRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CollectionRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: &str) -> Result<Option<Collection>> {
        let collection = sqlx::query_as::<_, Collection>(&format!(
            "SELECT {COLLECTION_COLUMNS} FROM collections WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(collection)
    }

    /// All collections under a connection
    pub async fn list_by_connection(&self, connection_id: &str) -> Result<Vec<Collection>> {
        let collections = sqlx::query_as::<_, Collection>(&format!(
            r#"
            SELECT {COLLECTION_COLUMNS} FROM collections
            WHERE connection_id = ?
            ORDER BY created_at ASC
            "#
        ))
        .bind(connection_id)
        .fetch_all(self.pool)
        .await?;

        Ok(collections)
    }

    pub async fn create(
        &self,
        connection_id: &str,
        created_by: &str,
        data: &CollectionCreate,
    ) -> Result<Collection> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO collections (id, connection_id, name, icon, created_by, version, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(connection_id)
        .bind(&data.name)
        .bind(&data.icon)
        .bind(created_by)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await?;

        Ok(Collection {
            id,
            connection_id: connection_id.to_string(),
            name: data.name.clone(),
            icon: data.icon.clone(),
            created_by: created_by.to_string(),
            version: 0,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Apply a partial update, bumping the version by one
    pub async fn update(&self, id: &str, data: &CollectionUpdate) -> Result<Option<Collection>> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"
            UPDATE collections
            SET name = COALESCE(?, name),
                icon = COALESCE(?, icon),
                version = version + 1,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&data.name)
        .bind(&data.icon)
        .bind(&now)
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get(id).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM collections WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
