//! Item API routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::db::{Item, ItemRepository, ItemUpdate, NewItem};
use crate::error::{AppError, Result};
use crate::state::AppState;

use super::collections::ensure_collection_access;

/// Create the items router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/collection/:collection_id", get(list_items))
        .route("/collection/:collection_id", post(create_item))
        .route("/:item_id", put(update_item))
        .route("/:item_id", delete(delete_item))
}

#[derive(Debug, Deserialize)]
struct ItemCreate {
    url: String,
    title: Option<String>,
    description: Option<String>,
}

/// List live items in a collection
async fn list_items(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(collection_id): Path<String>,
) -> Result<Json<Vec<Item>>> {
    ensure_collection_access(&state, &collection_id, &user.id).await?;

    let items = ItemRepository::new(state.db())
        .list_by_collection(&collection_id)
        .await?;

    Ok(Json(items))
}

/// Add a link to a collection, enriching it with preview metadata
async fn create_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(collection_id): Path<String>,
    Json(data): Json<ItemCreate>,
) -> Result<Json<Item>> {
    ensure_collection_access(&state, &collection_id, &user.id).await?;

    // Best-effort preview; client-supplied title/description win
    let preview = state.previews().fetch(&data.url).await;

    let item = ItemRepository::new(state.db())
        .create(&NewItem {
            collection_id,
            url: data.url,
            title: data.title.or(preview.title.clone()),
            description: data.description.or(preview.description.clone()),
            thumbnail_url: preview.thumbnail_url.clone(),
            platform: Some(preview.platform.clone()),
            created_by: user.id,
            metadata: Some(serde_json::to_value(&preview)?),
        })
        .await?;

    Ok(Json(item))
}

/// Resolve an item and verify access through its collection
async fn ensure_item_access(state: &AppState, item_id: &str, user_id: &str) -> Result<Item> {
    let item = ItemRepository::new(state.db())
        .get(item_id)
        .await?
        .ok_or_else(|| AppError::NotFound("item not found".to_string()))?;

    ensure_collection_access(state, &item.collection_id, user_id).await?;
    Ok(item)
}

/// Update an item's title or description
async fn update_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(item_id): Path<String>,
    Json(data): Json<ItemUpdate>,
) -> Result<Json<Item>> {
    ensure_item_access(&state, &item_id, &user.id).await?;

    let updated = ItemRepository::new(state.db())
        .update(&item_id, &data)
        .await?
        .ok_or_else(|| AppError::NotFound("item not found".to_string()))?;

    Ok(Json(updated))
}

/// Soft-delete an item
async fn delete_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(item_id): Path<String>,
) -> Result<StatusCode> {
    ensure_item_access(&state, &item_id, &user.id).await?;

    let deleted = ItemRepository::new(state.db()).soft_delete(&item_id).await?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("item not found".to_string()))
    }
}
