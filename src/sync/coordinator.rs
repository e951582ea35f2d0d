//! Sync coordination
//!
//! One `apply` call per client-submitted change. The entity read, the
//! conditional write, and the ledger append all happen inside a single
//! transaction, so a request either commits whole or leaves no trace.
//!
//! Accepted updates and deletes are fenced with
//! `UPDATE ... WHERE id = ? AND version = ?`; if a concurrent writer
//! advanced the row between our read and write, the fence loses and the
//! request degrades to the conflict path instead of clobbering the
//! newer record.

use chrono::Utc;
use serde_json::{json, Value};
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::db::{Collection, Item, ITEM_COLUMNS};

use super::ledger::{self, NewLedgerEntry};
use super::resolver::{decide, ConflictReason, Decision};
use super::types::{EntityKind, Operation, SyncRequest, SyncResponse};
use super::SyncError;

const COLLECTION_COLUMNS: &str =
    "id, connection_id, name, icon, created_by, version, created_at, updated_at";

/// Applies replayed offline mutations against the store
pub struct SyncCoordinator<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SyncCoordinator<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Apply one client-recorded mutation for an authenticated user.
    ///
    /// Business-level conflicts come back as an `Ok` response with
    /// `status: conflict`; only validation failures, missing targets,
    /// and persistence errors surface as `Err`.
    pub async fn apply(
        &self,
        user_id: &str,
        request: &SyncRequest,
    ) -> Result<SyncResponse, SyncError> {
        let entity_type = EntityKind::parse(&request.entity_type)
            .ok_or_else(|| SyncError::InvalidEntityType(request.entity_type.clone()))?;
        let operation = Operation::parse(&request.operation)
            .ok_or_else(|| SyncError::InvalidOperation(request.operation.clone()))?;

        if !entity_type.supports(operation) {
            return Err(SyncError::UnsupportedOperation {
                entity_type: entity_type.as_str(),
                operation: operation.as_str(),
            });
        }

        match entity_type {
            EntityKind::Item => self.apply_item(user_id, operation, request).await,
            EntityKind::Collection => self.apply_collection(user_id, operation, request).await,
        }
    }

    async fn apply_item(
        &self,
        user_id: &str,
        operation: Operation,
        request: &SyncRequest,
    ) -> Result<SyncResponse, SyncError> {
        let entity_id = request.entity_id.to_string();
        let mut tx = self.pool.begin().await?;

        let existing = fetch_item(&mut tx, &entity_id).await?;
        let decision = decide(
            operation,
            existing.as_ref().map(|i| i.version),
            request.incoming_version(),
        );

        match (decision, existing) {
            (Decision::ApplyCreate, _) => {
                let url = request
                    .data_str("url")
                    .ok_or(SyncError::MissingField("url"))?;
                let collection_id = request
                    .data_str("collection_id")
                    .ok_or(SyncError::MissingField("collection_id"))?;
                let now = Utc::now().to_rfc3339();

                sqlx::query(
                    r#"
                    INSERT INTO items (
                        id, collection_id, url, title, description, thumbnail_url,
                        platform, created_by, version, created_at, updated_at
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
                    "#,
                )
                .bind(&entity_id)
                .bind(collection_id)
                .bind(url)
                .bind(request.data_str("title"))
                .bind(request.data_str("description"))
                .bind(request.data_str("thumbnail_url"))
                .bind(request.data_str("platform"))
                .bind(user_id)
                .bind(&now)
                .bind(&now)
                .execute(&mut *tx)
                .await?;

                let created = require_item(&mut tx, &entity_id).await?;
                self.record(&mut tx, user_id, request, EntityKind::Item, operation, false)
                    .await?;
                tx.commit().await?;

                Ok(SyncResponse::success(serialize_item(&created)))
            }

            (Decision::Conflict(ConflictReason::AlreadyExists), Some(item)) => {
                // A conflicted create mutates nothing and, unlike
                // update/delete conflicts, appends no ledger entry.
                tx.rollback().await?;
                Ok(SyncResponse::conflict(
                    serialize_item(&item),
                    ConflictReason::AlreadyExists.message("item"),
                ))
            }

            (Decision::Conflict(ConflictReason::ServerNewer), Some(item)) => {
                self.record(&mut tx, user_id, request, EntityKind::Item, operation, true)
                    .await?;
                tx.commit().await?;
                Ok(SyncResponse::conflict(
                    serialize_item(&item),
                    ConflictReason::ServerNewer.message("item"),
                ))
            }

            (Decision::ApplyUpdate, Some(item)) => {
                let now = Utc::now().to_rfc3339();
                let result = sqlx::query(
                    r#"
                    UPDATE items
                    SET title = COALESCE(?, title),
                        description = COALESCE(?, description),
                        version = ?,
                        updated_at = ?
                    WHERE id = ? AND version = ?
                    "#,
                )
                .bind(request.data_str("title"))
                .bind(request.data_str("description"))
                .bind(item.version + 1)
                .bind(&now)
                .bind(&entity_id)
                .bind(item.version)
                .execute(&mut *tx)
                .await?;

                if result.rows_affected() == 0 {
                    return self
                        .lost_fence_item(tx, user_id, request, operation, &entity_id)
                        .await;
                }

                let updated = require_item(&mut tx, &entity_id).await?;
                self.record(&mut tx, user_id, request, EntityKind::Item, operation, false)
                    .await?;
                tx.commit().await?;

                Ok(SyncResponse::success(serialize_item(&updated)))
            }

            (Decision::ApplyDelete, Some(item)) => {
                let now = Utc::now().to_rfc3339();
                let result = sqlx::query(
                    r#"
                    UPDATE items
                    SET deleted_at = ?,
                        version = ?,
                        updated_at = ?
                    WHERE id = ? AND version = ?
                    "#,
                )
                .bind(&now)
                .bind(item.version + 1)
                .bind(&now)
                .bind(&entity_id)
                .bind(item.version)
                .execute(&mut *tx)
                .await?;

                if result.rows_affected() == 0 {
                    return self
                        .lost_fence_item(tx, user_id, request, operation, &entity_id)
                        .await;
                }

                let deleted = require_item(&mut tx, &entity_id).await?;
                self.record(&mut tx, user_id, request, EntityKind::Item, operation, false)
                    .await?;
                tx.commit().await?;

                Ok(SyncResponse::success(serialize_item(&deleted)))
            }

            (Decision::NotFound, _) => Err(SyncError::NotFound("item")),

            // decide() never yields apply/conflict variants without a
            // matching row state; treat an impossible pairing as absent.
            _ => Err(SyncError::NotFound("item")),
        }
    }

    /// The version fence lost to a concurrent writer: re-read the row
    /// and report the request as a conflict against the fresher record.
    async fn lost_fence_item(
        &self,
        mut tx: Transaction<'_, Sqlite>,
        user_id: &str,
        request: &SyncRequest,
        operation: Operation,
        entity_id: &str,
    ) -> Result<SyncResponse, SyncError> {
        let fresh = require_item(&mut tx, entity_id).await?;
        self.record(&mut tx, user_id, request, EntityKind::Item, operation, true)
            .await?;
        tx.commit().await?;

        Ok(SyncResponse::conflict(
            serialize_item(&fresh),
            ConflictReason::ServerNewer.message("item"),
        ))
    }

    async fn apply_collection(
        &self,
        user_id: &str,
        operation: Operation,
        request: &SyncRequest,
    ) -> Result<SyncResponse, SyncError> {
        let entity_id = request.entity_id.to_string();
        let mut tx = self.pool.begin().await?;

        let existing = fetch_collection(&mut tx, &entity_id).await?;
        let decision = decide(
            operation,
            existing.as_ref().map(|c| c.version),
            request.incoming_version(),
        );

        match (decision, existing) {
            (Decision::ApplyCreate, _) => {
                let name = request
                    .data_str("name")
                    .ok_or(SyncError::MissingField("name"))?;
                let connection_id = request
                    .data_str("connection_id")
                    .ok_or(SyncError::MissingField("connection_id"))?;
                let now = Utc::now().to_rfc3339();

                sqlx::query(
                    r#"
                    INSERT INTO collections (
                        id, connection_id, name, icon, created_by, version, created_at, updated_at
                    ) VALUES (?, ?, ?, ?, ?, 0, ?, ?)
                    "#,
                )
                .bind(&entity_id)
                .bind(connection_id)
                .bind(name)
                .bind(request.data_str("icon"))
                .bind(user_id)
                .bind(&now)
                .bind(&now)
                .execute(&mut *tx)
                .await?;

                let created = require_collection(&mut tx, &entity_id).await?;
                self.record(&mut tx, user_id, request, EntityKind::Collection, operation, false)
                    .await?;
                tx.commit().await?;

                Ok(SyncResponse::success(serialize_collection(&created)))
            }

            (Decision::Conflict(ConflictReason::AlreadyExists), Some(collection)) => {
                tx.rollback().await?;
                Ok(SyncResponse::conflict(
                    serialize_collection(&collection),
                    ConflictReason::AlreadyExists.message("collection"),
                ))
            }

            (Decision::Conflict(ConflictReason::ServerNewer), Some(collection)) => {
                self.record(&mut tx, user_id, request, EntityKind::Collection, operation, true)
                    .await?;
                tx.commit().await?;
                Ok(SyncResponse::conflict(
                    serialize_collection(&collection),
                    ConflictReason::ServerNewer.message("collection"),
                ))
            }

            (Decision::ApplyUpdate, Some(collection)) => {
                let now = Utc::now().to_rfc3339();
                let result = sqlx::query(
                    r#"
                    UPDATE collections
                    SET name = COALESCE(?, name),
                        icon = COALESCE(?, icon),
                        version = ?,
                        updated_at = ?
                    WHERE id = ? AND version = ?
                    "#,
                )
                .bind(request.data_str("name"))
                .bind(request.data_str("icon"))
                .bind(collection.version + 1)
                .bind(&now)
                .bind(&entity_id)
                .bind(collection.version)
                .execute(&mut *tx)
                .await?;

                if result.rows_affected() == 0 {
                    let fresh = require_collection(&mut tx, &entity_id).await?;
                    self.record(&mut tx, user_id, request, EntityKind::Collection, operation, true)
                        .await?;
                    tx.commit().await?;
                    return Ok(SyncResponse::conflict(
                        serialize_collection(&fresh),
                        ConflictReason::ServerNewer.message("collection"),
                    ));
                }

                let updated = require_collection(&mut tx, &entity_id).await?;
                self.record(&mut tx, user_id, request, EntityKind::Collection, operation, false)
                    .await?;
                tx.commit().await?;

                Ok(SyncResponse::success(serialize_collection(&updated)))
            }

            (Decision::NotFound, _) => Err(SyncError::NotFound("collection")),

            // Collection delete is rejected before dispatch; remaining
            // pairings are unreachable row states.
            _ => Err(SyncError::NotFound("collection")),
        }
    }

    async fn record(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        user_id: &str,
        request: &SyncRequest,
        entity_type: EntityKind,
        operation: Operation,
        conflict_resolved: bool,
    ) -> Result<(), SyncError> {
        ledger::append(
            tx,
            NewLedgerEntry {
                user_id,
                entity_type,
                entity_id: &request.entity_id.to_string(),
                operation,
                data: &request.data,
                client_timestamp: request.timestamp,
                conflict_resolved,
            },
        )
        .await
    }
}

async fn fetch_item(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
) -> Result<Option<Item>, SyncError> {
    let item = sqlx::query_as::<_, Item>(&format!(
        "SELECT {ITEM_COLUMNS} FROM items WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(item)
}

async fn require_item(tx: &mut Transaction<'_, Sqlite>, id: &str) -> Result<Item, SyncError> {
    fetch_item(tx, id).await?.ok_or(SyncError::NotFound("item"))
}

async fn fetch_collection(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
) -> Result<Option<Collection>, SyncError> {
    let collection = sqlx::query_as::<_, Collection>(&format!(
        "SELECT {COLLECTION_COLUMNS} FROM collections WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(collection)
}

async fn require_collection(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
) -> Result<Collection, SyncError> {
    fetch_collection(tx, id)
        .await?
        .ok_or(SyncError::NotFound("collection"))
}

/// Flat serialization for `server_data`; no nested relations
fn serialize_item(item: &Item) -> Value {
    json!({
        "id": item.id,
        "collection_id": item.collection_id,
        "url": item.url,
        "title": item.title,
        "description": item.description,
        "thumbnail_url": item.thumbnail_url,
        "platform": item.platform,
        "created_by": item.created_by,
        "version": item.version,
        "created_at": item.created_at,
        "updated_at": item.updated_at,
        "deleted_at": item.deleted_at,
    })
}

fn serialize_collection(collection: &Collection) -> Value {
    json!({
        "id": collection.id,
        "connection_id": collection.connection_id,
        "name": collection.name,
        "icon": collection.icon,
        "created_by": collection.created_by,
        "version": collection.version,
        "created_at": collection.created_at,
        "updated_at": collection.updated_at,
    })
}
