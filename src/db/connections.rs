//! Connection database operations
//!
//! A connection pairs two users; either participant may mutate the
//! collections and items underneath it. User ids are stored in sorted
//! order so a pair can exist only once.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::Result;

/// Connection record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Connection {
    pub id: String,
    pub user_id_1: String,
    pub user_id_2: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Connection status values
pub const STATUS_PENDING: &str = "pending";
pub const STATUS_ACCEPTED: &str = "accepted";
pub const STATUS_BLOCKED: &str = "blocked";

/// Connection repository
pub struct ConnectionRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ConnectionRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: &str) -> Result<Option<Connection>> {
        let connection = sqlx::query_as::<_, Connection>(
            r#"
            SELECT id, user_id_1, user_id_2, status, created_at, updated_at
            FROM connections
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(connection)
    }

    /// All connections a user participates in
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Connection>> {
        let connections = sqlx::query_as::<_, Connection>(
            r#"
            SELECT id, user_id_1, user_id_2, status, created_at, updated_at
            FROM connections
            WHERE user_id_1 = ? OR user_id_2 = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(connections)
    }

    /// Find an existing connection between two users, order-insensitive
    pub async fn find_between(&self, user_a: &str, user_b: &str) -> Result<Option<Connection>> {
        let (first, second) = sorted_pair(user_a, user_b);

        let connection = sqlx::query_as::<_, Connection>(
            r#"
            SELECT id, user_id_1, user_id_2, status, created_at, updated_at
            FROM connections
            WHERE user_id_1 = ? AND user_id_2 = ?
            "#,
        )
        .bind(first)
        .bind(second)
        .fetch_optional(self.pool)
        .await?;

        Ok(connection)
    }

    /// Create a pending connection between two users
    pub async fn create(&self, user_a: &str, user_b: &str) -> Result<Connection> {
        let (first, second) = sorted_pair(user_a, user_b);
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO connections (id, user_id_1, user_id_2, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(first)
        .bind(second)
        .bind(STATUS_PENDING)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await?;

        Ok(Connection {
            id,
            user_id_1: first.to_string(),
            user_id_2: second.to_string(),
            status: STATUS_PENDING.to_string(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Update connection status (accept / block)
    pub async fn update_status(&self, id: &str, status: &str) -> Result<bool> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"
            UPDATE connections
            SET status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(status)
        .bind(&now)
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Whether a user is one of the two participants of a connection
    pub async fn is_participant(&self, connection_id: &str, user_id: &str) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            SELECT 1 FROM connections
            WHERE id = ? AND (user_id_1 = ? OR user_id_2 = ?)
            "#,
        )
        .bind(connection_id)
        .bind(user_id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.is_some())
    }
}

fn sorted_pair<'b>(a: &'b str, b: &'b str) -> (&'b str, &'b str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, UserRepository};

    async fn seed_users(pool: &SqlitePool) -> (String, String) {
        let users = UserRepository::new(pool);
        let a = users.create("ana", "ana@example.com", "hash-a").await.unwrap();
        let b = users.create("ben", "ben@example.com", "hash-b").await.unwrap();
        (a.id, b.id)
    }

    #[tokio::test]
    async fn test_create_normalizes_user_order() {
        let pool = create_test_pool().await;
        let (a, b) = seed_users(&pool).await;
        let repo = ConnectionRepository::new(&pool);

        let conn = repo.create(&b, &a).await.unwrap();
        assert!(conn.user_id_1 < conn.user_id_2);

        // Lookup works regardless of argument order
        assert!(repo.find_between(&a, &b).await.unwrap().is_some());
        assert!(repo.find_between(&b, &a).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_participant_check() {
        let pool = create_test_pool().await;
        let (a, b) = seed_users(&pool).await;
        let repo = ConnectionRepository::new(&pool);

        let conn = repo.create(&a, &b).await.unwrap();
        assert!(repo.is_participant(&conn.id, &a).await.unwrap());
        assert!(repo.is_participant(&conn.id, &b).await.unwrap());
        assert!(!repo.is_participant(&conn.id, "someone-else").await.unwrap());
    }

    #[tokio::test]
    async fn test_status_transition() {
        let pool = create_test_pool().await;
        let (a, b) = seed_users(&pool).await;
        let repo = ConnectionRepository::new(&pool);

        let conn = repo.create(&a, &b).await.unwrap();
        assert_eq!(conn.status, STATUS_PENDING);

        assert!(repo.update_status(&conn.id, STATUS_ACCEPTED).await.unwrap());
        let updated = repo.get(&conn.id).await.unwrap().unwrap();
        assert_eq!(updated.status, STATUS_ACCEPTED);
    }
}
