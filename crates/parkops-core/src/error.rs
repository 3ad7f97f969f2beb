use parkops_proto::{MissionId, MissionStatus};

/// Failures of the local key-value backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend itself failed (I/O, SQLite, poisoned lock).
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A value was found but could not be decoded.
    #[error("corrupt data under key '{key}': {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode data for key '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Failures reported by a [`crate::MissionGateway`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The backend could not be reached or the request timed out.
    #[error("backend unreachable: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("{message} (HTTP {status})")]
    Status { status: u16, message: String },

    #[error("not found: {0}")]
    NotFound(String),

    /// The backend answered but the body was not what we expected.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// The backend refused the session token (HTTP 401).
    #[error("session rejected: {0}")]
    Unauthenticated(String),
}

impl GatewayError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound(_))
    }
}

/// Errors surfaced by the [`crate::Synchronizer`].
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("mission {0} not found")]
    NotFound(MissionId),

    #[error("mission {mission_id} cannot move from {from} to {to}")]
    InvalidTransition {
        mission_id: MissionId,
        from: MissionStatus,
        to: MissionStatus,
    },

    #[error("malformed notification: {0}")]
    MalformedNotification(String),
}
