//! Sync API endpoints
//!
//! One endpoint applies a replayed offline mutation; conflicts come
//! back as a 200 payload with `status: conflict`, while validation and
//! missing-target failures map to 400/404 through the app error type.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use crate::auth::CurrentUser;
use crate::error::Result;
use crate::state::AppState;
use crate::sync::{LedgerEntry, LedgerRepository, SyncCoordinator, SyncRequest, SyncResponse};

/// Create the sync router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/apply", post(apply_sync))
        .route("/log", get(list_sync_log))
}

/// Apply one offline change against server state
async fn apply_sync(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<SyncRequest>,
) -> Result<Json<SyncResponse>> {
    let coordinator = SyncCoordinator::new(state.db());
    let response = coordinator.apply(&user.id, &request).await?;

    if response.resolved_conflict {
        tracing::info!(
            entity_type = %request.entity_type,
            entity_id = %request.entity_id,
            operation = %request.operation,
            "Sync conflict resolved in favor of the server"
        );
    }

    Ok(Json(response))
}

/// The caller's recorded sync attempts, newest client activity first
async fn list_sync_log(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<LedgerEntry>>> {
    let entries = LedgerRepository::new(state.db())
        .list_for_user(&user.id, 100)
        .await?;

    Ok(Json(entries))
}
