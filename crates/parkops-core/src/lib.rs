pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod session;
pub mod storage;
pub mod sync;

// Re-export commonly used types and functions
pub use config::{normalize_server_url, Config};
pub use error::{GatewayError, StoreError, SyncError};
pub use gateway::MissionGateway;
pub use models::{sort_missions, MissionLifecycle, TaskChecklist};
pub use session::{Locale, PartitionKey, Session};
pub use storage::{CredentialVault, KeyValueStore, LocalMissionStore, MemoryStore, SqliteStore};
pub use sync::{
    AppendOutcome, FeedOrigin, IntakeOutcome, MissionFeed, MissionView, NotificationEvent,
    OpenOutcome, Submitted, SyncSettings, Synchronizer, ViewOrigin,
};

pub use parkops_proto as proto;
