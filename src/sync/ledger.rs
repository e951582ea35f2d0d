//! Sync ledger persistence
//!
//! Append-only audit trail of processed sync requests. Rows are written
//! exactly once by the coordinator, inside the request transaction, and
//! never updated or deleted afterward.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::types::{EntityKind, Operation};
use super::SyncError;

/// One recorded sync attempt
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LedgerEntry {
    pub id: String,
    pub user_id: String,
    pub entity_type: String,
    pub entity_id: String,
    pub operation: String,
    /// The client's submitted payload, stored opaquely as JSON text
    pub data: String,
    /// Client epoch milliseconds; audit ordering only
    pub client_timestamp: i64,
    pub server_timestamp: String,
    pub synced: bool,
    pub conflict_resolved: bool,
}

/// Parameters for one ledger append
#[derive(Debug)]
pub struct NewLedgerEntry<'a> {
    pub user_id: &'a str,
    pub entity_type: EntityKind,
    pub entity_id: &'a str,
    pub operation: Operation,
    pub data: &'a serde_json::Map<String, Value>,
    pub client_timestamp: i64,
    pub conflict_resolved: bool,
}

/// Append an entry within the caller's transaction
pub(super) async fn append(
    conn: &mut SqliteConnection,
    entry: NewLedgerEntry<'_>,
) -> Result<(), SyncError> {
    let id = Uuid::new_v4().to_string();
    let data = serde_json::to_string(entry.data)?;
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO sync_log (
            id, user_id, entity_type, entity_id, operation,
            data, client_timestamp, server_timestamp, synced, conflict_resolved
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1, ?)
        "#,
    )
    .bind(&id)
    .bind(entry.user_id)
    .bind(entry.entity_type.as_str())
    .bind(entry.entity_id)
    .bind(entry.operation.as_str())
    .bind(&data)
    .bind(entry.client_timestamp)
    .bind(&now)
    .bind(entry.conflict_resolved)
    .execute(conn)
    .await?;

    Ok(())
}

/// Read-side access to the ledger
pub struct LedgerRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> LedgerRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// A user's recorded sync attempts, most recent client activity first
    pub async fn list_for_user(&self, user_id: &str, limit: i64) -> Result<Vec<LedgerEntry>, SyncError> {
        let entries = sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT id, user_id, entity_type, entity_id, operation,
                   data, client_timestamp, server_timestamp, synced, conflict_resolved
            FROM sync_log
            WHERE user_id = ?
            ORDER BY client_timestamp DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(entries)
    }

    /// Number of ledger rows recorded for one entity
    #[cfg(test)]
    pub(crate) async fn count_for_entity(&self, entity_type: EntityKind, entity_id: &str) -> Result<i64, SyncError> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sync_log WHERE entity_type = ? AND entity_id = ?",
        )
        .bind(entity_type.as_str())
        .bind(entity_id)
        .fetch_one(self.pool)
        .await?;

        Ok(row.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    #[tokio::test]
    async fn test_append_and_list() {
        let pool = create_test_pool().await;
        let users = crate::db::UserRepository::new(&pool);
        let user = users.create("ana", "ana@example.com", "hash-a").await.unwrap();

        let mut data = serde_json::Map::new();
        data.insert("title".to_string(), Value::String("hi".to_string()));

        let mut tx = pool.begin().await.unwrap();
        append(
            &mut tx,
            NewLedgerEntry {
                user_id: &user.id,
                entity_type: EntityKind::Item,
                entity_id: "item-1",
                operation: Operation::Update,
                data: &data,
                client_timestamp: 1_700_000_000_000,
                conflict_resolved: false,
            },
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let repo = LedgerRepository::new(&pool);
        let entries = repo.list_for_user(&user.id, 10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entity_type, "item");
        assert_eq!(entries[0].operation, "update");
        assert!(entries[0].synced);
        assert!(!entries[0].conflict_resolved);
        assert_eq!(entries[0].data, r#"{"title":"hi"}"#);

        assert_eq!(
            repo.count_for_entity(EntityKind::Item, "item-1").await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_rolled_back_append_leaves_no_row() {
        let pool = create_test_pool().await;
        let users = crate::db::UserRepository::new(&pool);
        let user = users.create("ana", "ana@example.com", "hash-a").await.unwrap();

        let data = serde_json::Map::new();
        let mut tx = pool.begin().await.unwrap();
        append(
            &mut tx,
            NewLedgerEntry {
                user_id: &user.id,
                entity_type: EntityKind::Collection,
                entity_id: "col-1",
                operation: Operation::Create,
                data: &data,
                client_timestamp: 1,
                conflict_resolved: false,
            },
        )
        .await
        .unwrap();
        tx.rollback().await.unwrap();

        let repo = LedgerRepository::new(&pool);
        assert_eq!(
            repo.count_for_entity(EntityKind::Collection, "col-1").await.unwrap(),
            0
        );
    }
}
