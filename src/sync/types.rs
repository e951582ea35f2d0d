//! Sync wire types
//!
//! The request mirrors what offline clients queue locally: an entity
//! reference, the operation, a client timestamp, and an open map of
//! field values with an optional `version` key.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Entity kinds subject to sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Item,
    Collection,
}

impl EntityKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "item" => Some(Self::Item),
            "collection" => Some(Self::Collection),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Item => "item",
            Self::Collection => "collection",
        }
    }

    /// Declared per-entity operation capabilities
    ///
    /// Collections are created and renamed through sync but never
    /// deleted by it; only items carry a soft-delete path.
    pub fn supports(self, operation: Operation) -> bool {
        match (self, operation) {
            (Self::Collection, Operation::Delete) => false,
            _ => true,
        }
    }
}

/// Sync operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// One client-recorded mutation to replay against the server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRequest {
    /// "item" or "collection"; anything else is rejected before any
    /// store access
    pub entity_type: String,
    /// Target entity id; client-generated for offline creates
    pub entity_id: Uuid,
    /// "create", "update" or "delete"
    pub operation: String,
    /// Client epoch milliseconds; audit ordering only, never used for
    /// conflict resolution
    pub timestamp: i64,
    /// Open map of field values; unrecognized keys are ignored
    pub data: serde_json::Map<String, Value>,
}

impl SyncRequest {
    /// The client's claimed base version; a missing key means 0
    pub fn incoming_version(&self) -> i64 {
        self.data
            .get("version")
            .and_then(Value::as_i64)
            .unwrap_or(0)
    }

    /// A recognized string field from the payload
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}

/// Outcome of one sync request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResponse {
    pub status: SyncStatus,
    pub resolved_conflict: bool,
    pub server_data: Option<Value>,
    /// Always present on the wire; `null` on success
    pub message: Option<String>,
}

impl SyncResponse {
    pub fn success(server_data: Value) -> Self {
        Self {
            status: SyncStatus::Success,
            resolved_conflict: false,
            server_data: Some(server_data),
            message: None,
        }
    }

    pub fn conflict(server_data: Value, message: impl Into<String>) -> Self {
        Self {
            status: SyncStatus::Conflict,
            resolved_conflict: true,
            server_data: Some(server_data),
            message: Some(message.into()),
        }
    }
}

/// Business-level status of a sync request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Success,
    Conflict,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_version_defaults_to_zero() {
        let request: SyncRequest = serde_json::from_value(serde_json::json!({
            "entity_type": "item",
            "entity_id": "4f2c9c6e-95b5-4df0-8fb3-1f6f2b8c9a01",
            "operation": "update",
            "timestamp": 1_700_000_000_000_i64,
            "data": { "title": "hello" }
        }))
        .unwrap();

        assert_eq!(request.incoming_version(), 0);
    }

    #[test]
    fn test_collection_declares_no_delete() {
        assert!(EntityKind::Collection.supports(Operation::Create));
        assert!(EntityKind::Collection.supports(Operation::Update));
        assert!(!EntityKind::Collection.supports(Operation::Delete));
        assert!(EntityKind::Item.supports(Operation::Delete));
    }

    #[test]
    fn test_success_response_keeps_null_message_key() {
        let response = SyncResponse::success(serde_json::json!({ "id": "x" }));
        let value = serde_json::to_value(&response).unwrap();

        let object = value.as_object().unwrap();
        assert!(object.contains_key("message"));
        assert!(object["message"].is_null());
        assert_eq!(object["status"], "success");
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SyncStatus::Conflict).unwrap(),
            "\"conflict\""
        );
    }
}
