//! Connection API routes

use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::db::{
    Connection, ConnectionRepository, UserRepository, STATUS_ACCEPTED, STATUS_BLOCKED,
};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Create the connections router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_connections))
        .route("/", post(create_connection))
        .route("/:connection_id/status", put(update_status))
}

#[derive(Debug, Deserialize)]
struct ConnectionCreate {
    /// The other user to pair with
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct StatusUpdate {
    status: String,
}

/// List the caller's connections
async fn list_connections(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Connection>>> {
    let connections = ConnectionRepository::new(state.db())
        .list_for_user(&user.id)
        .await?;

    Ok(Json(connections))
}

/// Request a connection with another user
async fn create_connection(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(data): Json<ConnectionCreate>,
) -> Result<Json<Connection>> {
    if data.user_id == user.id {
        return Err(AppError::BadRequest(
            "cannot create a connection with yourself".to_string(),
        ));
    }

    let other = UserRepository::new(state.db())
        .get(&data.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;

    let repo = ConnectionRepository::new(state.db());
    if repo.find_between(&user.id, &other.id).await?.is_some() {
        return Err(AppError::BadRequest("connection already exists".to_string()));
    }

    let connection = repo.create(&user.id, &other.id).await?;
    Ok(Json(connection))
}

/// Accept or block a pending connection
async fn update_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(connection_id): Path<String>,
    Json(data): Json<StatusUpdate>,
) -> Result<Json<Connection>> {
    if data.status != STATUS_ACCEPTED && data.status != STATUS_BLOCKED {
        return Err(AppError::BadRequest(format!(
            "invalid status: {}",
            data.status
        )));
    }

    let repo = ConnectionRepository::new(state.db());
    repo.get(&connection_id)
        .await?
        .ok_or_else(|| AppError::NotFound("connection not found".to_string()))?;

    if !repo.is_participant(&connection_id, &user.id).await? {
        return Err(AppError::Forbidden(
            "not a participant of this connection".to_string(),
        ));
    }

    repo.update_status(&connection_id, &data.status).await?;
    let updated = repo
        .get(&connection_id)
        .await?
        .ok_or_else(|| AppError::NotFound("connection not found".to_string()))?;

    Ok(Json(updated))
}
