//! Conflict resolution
//!
//! Pure decision logic for one replayed mutation. The server version is
//! the sole conflict signal: last-writer-wins at whole-record
//! granularity, no field merging.

use super::types::Operation;

/// What the coordinator should do with a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    ApplyCreate,
    ApplyUpdate,
    ApplyDelete,
    Conflict(ConflictReason),
    NotFound,
}

/// Why a mutation conflicted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictReason {
    /// A create targeted an id that already exists
    AlreadyExists,
    /// The stored version is ahead of the client's claimed base version
    ServerNewer,
}

impl ConflictReason {
    pub fn message(self, entity: &str) -> String {
        match self {
            Self::AlreadyExists => format!("{entity} already exists on the server"),
            Self::ServerNewer => "conflict: server version is newer".to_string(),
        }
    }
}

/// Decide how a mutation applies against the stored version.
///
/// Equal versions do not conflict: replaying the same client version is
/// treated as a safe re-application and still advances the server by
/// one.
pub fn decide(
    operation: Operation,
    existing_version: Option<i64>,
    incoming_version: i64,
) -> Decision {
    match operation {
        Operation::Create => match existing_version {
            Some(_) => Decision::Conflict(ConflictReason::AlreadyExists),
            None => Decision::ApplyCreate,
        },
        Operation::Update | Operation::Delete => match existing_version {
            None => Decision::NotFound,
            Some(server) if server > incoming_version => {
                Decision::Conflict(ConflictReason::ServerNewer)
            }
            Some(_) => match operation {
                Operation::Update => Decision::ApplyUpdate,
                _ => Decision::ApplyDelete,
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_against_missing_applies() {
        assert_eq!(decide(Operation::Create, None, 0), Decision::ApplyCreate);
        assert_eq!(decide(Operation::Create, None, 42), Decision::ApplyCreate);
    }

    #[test]
    fn test_create_against_existing_conflicts_regardless_of_version() {
        for incoming in [0, 1, 5, 100] {
            assert_eq!(
                decide(Operation::Create, Some(2), incoming),
                Decision::Conflict(ConflictReason::AlreadyExists)
            );
        }
    }

    #[test]
    fn test_update_against_missing_is_not_found() {
        assert_eq!(decide(Operation::Update, None, 3), Decision::NotFound);
        assert_eq!(decide(Operation::Delete, None, 3), Decision::NotFound);
    }

    #[test]
    fn test_stale_update_conflicts() {
        assert_eq!(
            decide(Operation::Update, Some(2), 1),
            Decision::Conflict(ConflictReason::ServerNewer)
        );
        assert_eq!(
            decide(Operation::Delete, Some(5), 0),
            Decision::Conflict(ConflictReason::ServerNewer)
        );
    }

    #[test]
    fn test_equal_versions_apply() {
        assert_eq!(decide(Operation::Update, Some(2), 2), Decision::ApplyUpdate);
        assert_eq!(decide(Operation::Delete, Some(2), 2), Decision::ApplyDelete);
    }

    #[test]
    fn test_ahead_client_applies() {
        // The client claims a version ahead of the server; the server
        // has no record of losing writes, so the mutation is accepted.
        assert_eq!(decide(Operation::Update, Some(2), 3), Decision::ApplyUpdate);
    }
}
