//! HTTP-level tests for the sync endpoint and its error mapping

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};

use share_links_server::auth::hash_token;
use share_links_server::config::Config;
use share_links_server::db::{
    self, CollectionCreate, CollectionRepository, ConnectionRepository, UserRepository,
};
use share_links_server::state::AppState;
use share_links_server::{app, sync::SyncResponse};

const TOKEN: &str = "test-token";

struct TestContext {
    server: TestServer,
    connection_id: String,
    collection_id: String,
}

async fn setup() -> TestContext {
    let pool = db::create_test_pool().await;

    let users = UserRepository::new(&pool);
    let ana = users
        .create("ana", "ana@example.com", &hash_token(TOKEN))
        .await
        .unwrap();
    let ben = users
        .create("ben", "ben@example.com", &hash_token("ben-token"))
        .await
        .unwrap();

    let connection = ConnectionRepository::new(&pool)
        .create(&ana.id, &ben.id)
        .await
        .unwrap();
    let collection = CollectionRepository::new(&pool)
        .create(
            &connection.id,
            &ana.id,
            &CollectionCreate {
                name: "Watchlist".to_string(),
                icon: None,
            },
        )
        .await
        .unwrap();

    let state = AppState::new(Config::default(), pool);
    let server = TestServer::new(app(state)).unwrap();

    TestContext {
        server,
        connection_id: connection.id,
        collection_id: collection.id,
    }
}

fn auth_header() -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("authorization"),
        HeaderValue::from_str(&format!("Bearer {TOKEN}")).unwrap(),
    )
}

fn sync_body(entity_type: &str, entity_id: &str, operation: &str, data: Value) -> Value {
    json!({
        "entity_type": entity_type,
        "entity_id": entity_id,
        "operation": operation,
        "timestamp": 1_700_000_000_000_i64,
        "data": data,
    })
}

#[tokio::test]
async fn test_health() {
    let ctx = setup().await;

    let response = ctx.server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "share-links-server");
}

#[tokio::test]
async fn test_apply_sync_requires_auth() {
    let ctx = setup().await;

    let body = sync_body(
        "item",
        "4f2c9c6e-95b5-4df0-8fb3-1f6f2b8c9a01",
        "create",
        json!({ "url": "https://example.com" }),
    );

    let response = ctx.server.post("/api/v1/sync/apply").json(&body).await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_apply_sync_rejects_unknown_entity_type() {
    let ctx = setup().await;
    let (name, value) = auth_header();

    let body = sync_body(
        "gadget",
        "4f2c9c6e-95b5-4df0-8fb3-1f6f2b8c9a01",
        "create",
        json!({}),
    );

    let response = ctx
        .server
        .post("/api/v1/sync/apply")
        .add_header(name, value)
        .json(&body)
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_apply_sync_update_missing_is_404() {
    let ctx = setup().await;
    let (name, value) = auth_header();

    let body = sync_body(
        "item",
        "4f2c9c6e-95b5-4df0-8fb3-1f6f2b8c9a01",
        "update",
        json!({ "title": "x", "version": 0 }),
    );

    let response = ctx
        .server
        .post("/api/v1/sync/apply")
        .add_header(name, value)
        .json(&body)
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_collection_delete_via_sync_is_rejected() {
    let ctx = setup().await;
    let (name, value) = auth_header();

    let body = sync_body(
        "collection",
        &ctx.collection_id,
        "delete",
        json!({ "version": 0 }),
    );

    let response = ctx
        .server
        .post("/api/v1/sync/apply")
        .add_header(name, value)
        .json(&body)
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_offline_create_then_duplicate_create_conflicts() {
    let ctx = setup().await;
    let (name, value) = auth_header();
    let client_id = "7b0a7f6a-3f41-4b1e-9a37-1c2d3e4f5a6b";

    let body = sync_body(
        "item",
        client_id,
        "create",
        json!({
            "url": "https://example.com/article",
            "title": "An article",
            "collection_id": ctx.collection_id,
        }),
    );

    let response = ctx
        .server
        .post("/api/v1/sync/apply")
        .add_header(name.clone(), value.clone())
        .json(&body)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let first: SyncResponse = response.json();
    assert!(!first.resolved_conflict);
    let data = first.server_data.unwrap();
    assert_eq!(data["id"], client_id);
    assert_eq!(data["version"], 0);

    // Replaying the create against the now-existing id conflicts
    let response = ctx
        .server
        .post("/api/v1/sync/apply")
        .add_header(name, value)
        .json(&body)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let second: Value = response.json();
    assert_eq!(second["status"], "conflict");
    assert_eq!(second["resolved_conflict"], true);
    assert_eq!(second["server_data"]["id"], client_id);
}

#[tokio::test]
async fn test_stale_update_returns_conflict_payload() {
    let ctx = setup().await;
    let (name, value) = auth_header();
    let client_id = "9d8c7b6a-5e4f-4d3c-8b2a-1f0e9d8c7b6a";

    // Create the item, then advance it to version 2 with two accepted updates
    let create = sync_body(
        "item",
        client_id,
        "create",
        json!({
            "url": "https://example.com/post",
            "title": "v0",
            "collection_id": ctx.collection_id,
        }),
    );
    ctx.server
        .post("/api/v1/sync/apply")
        .add_header(name.clone(), value.clone())
        .json(&create)
        .await;

    for (version, title) in [(0, "v1"), (1, "v2")] {
        let update = sync_body(
            "item",
            client_id,
            "update",
            json!({ "title": title, "version": version }),
        );
        let response = ctx
            .server
            .post("/api/v1/sync/apply")
            .add_header(name.clone(), value.clone())
            .json(&update)
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["status"], "success");
    }

    // A stale edit against version 1 must lose to the server's version 2
    let stale = sync_body(
        "item",
        client_id,
        "update",
        json!({ "title": "stale", "version": 1 }),
    );
    let response = ctx
        .server
        .post("/api/v1/sync/apply")
        .add_header(name.clone(), value.clone())
        .json(&stale)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["status"], "conflict");
    assert_eq!(body["resolved_conflict"], true);
    assert_eq!(body["server_data"]["version"], 2);
    assert_eq!(body["server_data"]["title"], "v2");

    // The audit trail recorded the create, both updates, and the conflict
    let response = ctx
        .server
        .get("/api/v1/sync/log")
        .add_header(name, value)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let entries: Vec<Value> = response.json();
    assert_eq!(entries.len(), 4);
    assert_eq!(
        entries
            .iter()
            .filter(|e| e["conflict_resolved"] == true)
            .count(),
        1
    );
}

#[tokio::test]
async fn test_collection_sync_roundtrip() {
    let ctx = setup().await;
    let (name, value) = auth_header();
    let client_id = "2a1b3c4d-5e6f-4a7b-8c9d-0e1f2a3b4c5d";

    let create = sync_body(
        "collection",
        client_id,
        "create",
        json!({
            "name": "Trips",
            "icon": "✈️",
            "connection_id": ctx.connection_id,
        }),
    );
    let response = ctx
        .server
        .post("/api/v1/sync/apply")
        .add_header(name.clone(), value.clone())
        .json(&create)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["status"], "success");
    assert_eq!(body["server_data"]["name"], "Trips");
    assert_eq!(body["server_data"]["version"], 0);

    let update = sync_body(
        "collection",
        client_id,
        "update",
        json!({ "name": "Trips 2026", "version": 0 }),
    );
    let response = ctx
        .server
        .post("/api/v1/sync/apply")
        .add_header(name, value)
        .json(&update)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["server_data"]["version"], 1);
    assert_eq!(body["server_data"]["name"], "Trips 2026");
}
