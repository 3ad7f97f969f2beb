use chrono::{DateTime, Utc};

use crate::error::SyncError;
use parkops_proto::{Mission, MissionId, MissionPayload, MissionStatus};

/// Forward-only status transitions on a [`Mission`].
pub trait MissionLifecycle {
    /// A mission announced by a push notification.
    fn announced(id: MissionId, payload: MissionPayload, at: DateTime<Utc>) -> Self;

    /// `unopened` -> `in_progress`, stamping `openedAt`.
    fn mark_opened(&mut self, at: DateTime<Utc>) -> Result<(), SyncError>;

    /// `in_progress` -> `completed`, stamping `completedAt`.
    fn mark_completed(&mut self, at: DateTime<Utc>) -> Result<(), SyncError>;
}

impl MissionLifecycle for Mission {
    fn announced(id: MissionId, payload: MissionPayload, at: DateTime<Utc>) -> Self {
        let mut mission = Mission::new(id, payload);
        mission.created_at = Some(at);
        mission
    }

    fn mark_opened(&mut self, at: DateTime<Utc>) -> Result<(), SyncError> {
        advance(self, MissionStatus::InProgress)?;
        self.opened_at = Some(at);
        Ok(())
    }

    fn mark_completed(&mut self, at: DateTime<Utc>) -> Result<(), SyncError> {
        advance(self, MissionStatus::Completed)?;
        self.completed_at = Some(at);
        Ok(())
    }
}

fn advance(mission: &mut Mission, to: MissionStatus) -> Result<(), SyncError> {
    if !mission.status.can_advance_to(to) {
        return Err(SyncError::InvalidTransition {
            mission_id: mission.mission_id.clone(),
            from: mission.status,
            to,
        });
    }
    mission.status = to;
    Ok(())
}

/// Take a backend record as authoritative, except that it may never move the
/// local status backwards. When the local copy is further along (for example
/// an open call that never reached the backend), its status and the matching
/// timestamps are kept.
pub fn reconcile(local: Option<&Mission>, mut remote: Mission) -> Mission {
    let Some(local) = local else {
        return remote;
    };

    let status = remote.status.furthest(local.status);
    if status != remote.status {
        remote.status = status;
        remote.opened_at = remote.opened_at.or(local.opened_at);
        if local.status.is_terminal() {
            remote.completed_at = remote.completed_at.or(local.completed_at);
        }
    }
    remote
}
