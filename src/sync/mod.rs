//! Offline-sync reconciliation
//!
//! Clients record mutations while offline and replay them here. The
//! coordinator compares each replayed mutation against server state,
//! applies it or reports a conflict, and appends an audit-trail entry,
//! all inside one transaction per request.

mod coordinator;
mod ledger;
mod resolver;
mod types;

pub use coordinator::SyncCoordinator;
pub use ledger::{LedgerEntry, LedgerRepository};
pub use resolver::{decide, ConflictReason, Decision};
pub use types::{EntityKind, Operation, SyncRequest, SyncResponse, SyncStatus};

use thiserror::Error;

use crate::error::AppError;

/// Request-level sync failures
///
/// Business-level conflicts are not errors; they come back as a normal
/// `SyncResponse` with `status: conflict`. These variants are the cases
/// that surface to the transport layer as HTTP failures instead.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("unknown entity type: {0}")]
    InvalidEntityType(String),

    #[error("unknown operation: {0}")]
    InvalidOperation(String),

    #[error("operation '{operation}' is not supported for entity type '{entity_type}'")]
    UnsupportedOperation {
        entity_type: &'static str,
        operation: &'static str,
    },

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::InvalidEntityType(_)
            | SyncError::InvalidOperation(_)
            | SyncError::UnsupportedOperation { .. }
            | SyncError::MissingField(_) => AppError::BadRequest(err.to_string()),
            SyncError::NotFound(_) => AppError::NotFound(err.to_string()),
            SyncError::Database(e) => AppError::Database(e),
            SyncError::Serialization(e) => AppError::Json(e),
        }
    }
}
