//! Share Links Server
//!
//! Backend for a shared-bookmark application: pairs of users form
//! connections, organize links into collections, and replay offline
//! changes through a sync endpoint that detects and resolves conflicts.

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod metadata;
pub mod routes;
pub mod state;
pub mod sync;

use state::AppState;

/// Build the full application router
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/health", routes::health::router())
        .nest("/api/v1/connections", routes::connections::router())
        .nest("/api/v1/collections", routes::collections::router())
        .nest("/api/v1/items", routes::items::router())
        .nest("/api/v1/sync", routes::sync::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
