//! Collection API routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};

use crate::auth::CurrentUser;
use crate::db::{
    Collection, CollectionCreate, CollectionRepository, CollectionUpdate, ConnectionRepository,
};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Create the collections router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/connection/:connection_id", get(list_collections))
        .route("/connection/:connection_id", post(create_collection))
        .route("/:collection_id", put(update_collection))
        .route("/:collection_id", delete(delete_collection))
}

/// Verify the caller participates in the connection
async fn ensure_connection_access(
    state: &AppState,
    connection_id: &str,
    user_id: &str,
) -> Result<()> {
    let repo = ConnectionRepository::new(state.db());
    repo.get(connection_id)
        .await?
        .ok_or_else(|| AppError::NotFound("connection not found".to_string()))?;

    if !repo.is_participant(connection_id, user_id).await? {
        return Err(AppError::Forbidden(
            "not a participant of this connection".to_string(),
        ));
    }

    Ok(())
}

/// Resolve a collection and verify access through its connection
pub(crate) async fn ensure_collection_access(
    state: &AppState,
    collection_id: &str,
    user_id: &str,
) -> Result<Collection> {
    let collection = CollectionRepository::new(state.db())
        .get(collection_id)
        .await?
        .ok_or_else(|| AppError::NotFound("collection not found".to_string()))?;

    ensure_connection_access(state, &collection.connection_id, user_id).await?;
    Ok(collection)
}

/// List all collections under a connection
async fn list_collections(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(connection_id): Path<String>,
) -> Result<Json<Vec<Collection>>> {
    ensure_connection_access(&state, &connection_id, &user.id).await?;

    let collections = CollectionRepository::new(state.db())
        .list_by_connection(&connection_id)
        .await?;

    Ok(Json(collections))
}

/// Create a collection under a connection
async fn create_collection(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(connection_id): Path<String>,
    Json(data): Json<CollectionCreate>,
) -> Result<Json<Collection>> {
    ensure_connection_access(&state, &connection_id, &user.id).await?;

    let collection = CollectionRepository::new(state.db())
        .create(&connection_id, &user.id, &data)
        .await?;

    Ok(Json(collection))
}

/// Update a collection; either participant may edit
async fn update_collection(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(collection_id): Path<String>,
    Json(data): Json<CollectionUpdate>,
) -> Result<Json<Collection>> {
    ensure_collection_access(&state, &collection_id, &user.id).await?;

    let updated = CollectionRepository::new(state.db())
        .update(&collection_id, &data)
        .await?
        .ok_or_else(|| AppError::NotFound("collection not found".to_string()))?;

    Ok(Json(updated))
}

/// Delete a collection and (by cascade) its items
async fn delete_collection(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(collection_id): Path<String>,
) -> Result<StatusCode> {
    ensure_collection_access(&state, &collection_id, &user.id).await?;

    CollectionRepository::new(state.db())
        .delete(&collection_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
