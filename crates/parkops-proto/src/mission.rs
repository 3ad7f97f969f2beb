use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

identifier!(
    /// Opaque mission identifier assigned by the backend.
    MissionId
);

/// Lifecycle state of a mission. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    #[default]
    Unopened,
    InProgress,
    Completed,
}

impl MissionStatus {
    /// Position in the lifecycle, also used as the display priority.
    pub fn rank(self) -> u8 {
        match self {
            MissionStatus::Unopened => 0,
            MissionStatus::InProgress => 1,
            MissionStatus::Completed => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MissionStatus::Unopened => "unopened",
            MissionStatus::InProgress => "in_progress",
            MissionStatus::Completed => "completed",
        }
    }

    /// Whether moving from `self` to `next` goes strictly forward.
    pub fn can_advance_to(self, next: MissionStatus) -> bool {
        next.rank() > self.rank()
    }

    /// The later of two statuses.
    pub fn furthest(self, other: MissionStatus) -> MissionStatus {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }

    pub fn is_terminal(self) -> bool {
        self == MissionStatus::Completed
    }
}

impl fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single collection, refill or maintenance job for one machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mission {
    pub mission_id: MissionId,

    #[serde(default)]
    pub status: MissionStatus,

    #[serde(default)]
    pub payload: MissionPayload,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opened_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Fields the backend sends that this client does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Mission {
    pub fn new(mission_id: impl Into<MissionId>, payload: MissionPayload) -> Self {
        Self {
            mission_id: mission_id.into(),
            status: MissionStatus::Unopened,
            payload,
            created_at: None,
            opened_at: None,
            completed_at: None,
            extra: Map::new(),
        }
    }
}

/// Semi-structured job description attached to a mission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cashier: Option<String>,

    /// Free-form date string as entered on the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collect: Option<CollectTasks>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refill: Option<RefillTasks>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub maintenance: Vec<MaintenanceTask>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectTasks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<CashTask>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coins: Option<CashTask>,
}

/// A collection sub-task: an amount of cash to take out of the machine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CashTask {
    #[serde(default)]
    pub amount: f64,

    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefillTasks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<RefillTask>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coins: Option<RefillTask>,
}

/// A refill sub-task with an optional per-denomination breakdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefillTask {
    #[serde(default)]
    pub amount: f64,

    #[serde(default)]
    pub completed: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_types: Option<BTreeMap<String, u32>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coin_types: Option<BTreeMap<String, u32>>,
}

impl RefillTask {
    /// Denomination label to count, whichever breakdown the backend sent.
    pub fn denominations(&self) -> Option<&BTreeMap<String, u32>> {
        self.note_types.as_ref().or(self.coin_types.as_ref())
    }
}

/// A maintenance item: either a bare description or a tracked record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaintenanceTask {
    Tracked {
        task: String,
        #[serde(default)]
        completed: bool,
    },
    Bare(String),
}

impl MaintenanceTask {
    pub fn description(&self) -> &str {
        match self {
            MaintenanceTask::Tracked { task, .. } => task,
            MaintenanceTask::Bare(task) => task,
        }
    }

    pub fn is_completed(&self) -> bool {
        match self {
            MaintenanceTask::Tracked { completed, .. } => *completed,
            MaintenanceTask::Bare(_) => false,
        }
    }
}

/// Paging metadata reported by the backend alongside every list page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,

    #[serde(default)]
    pub total_pages: u32,

    #[serde(default)]
    pub has_next_page: bool,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            total_pages: 1,
            has_next_page: false,
        }
    }
}

/// One page of missions in the order the backend emitted them.
#[derive(Debug, Clone, PartialEq)]
pub struct MissionPage {
    pub missions: Vec<Mission>,
    pub pagination: Pagination,
}

/// Body of a mission completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionUpdate {
    pub status: MissionStatus,
    pub collect: CollectUpdate,
    pub refill: RefillUpdate,
    pub maintenance: Vec<MaintenanceUpdate>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub completed: bool,
}

impl From<bool> for Completion {
    fn from(completed: bool) -> Self {
        Self { completed }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectUpdate {
    pub notes: Completion,
    pub coins: Completion,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefillUpdate {
    pub coins: Completion,
    pub notes: Completion,
}

/// Maintenance items are addressed by their position in the payload list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceUpdate {
    pub index: usize,
    pub completed: bool,
}
