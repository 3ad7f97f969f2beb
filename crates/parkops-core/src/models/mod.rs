pub mod checklist;
pub mod lifecycle;
pub mod ordering;

pub use checklist::{ChecklistTask, MaintenanceCheck, TaskChecklist};
pub use lifecycle::{reconcile, MissionLifecycle};
pub use ordering::{compare_missions, parse_mission_date, sort_missions};
pub use parkops_proto::{Mission, MissionId, MissionPayload, MissionStatus};
