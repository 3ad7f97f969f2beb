use serde_json::Value;

use crate::error::{GatewayError, SyncError};
use parkops_proto::{Mission, MissionId, MissionPayload, PushData};

/// A push notification, reduced to what the synchronizer acts on.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationEvent {
    /// A mission was assigned. `payload` is a JSON object or a JSON-encoded
    /// string holding one.
    NewMission { id: MissionId, payload: Value },
    /// The operator tapped a notification for this mission.
    Tapped { id: MissionId },
}

impl NotificationEvent {
    /// Decode the data block of a push message. `tapped` tells whether the
    /// message arrived through a user tap rather than in the foreground.
    pub fn from_push_data(data: PushData, tapped: bool) -> Result<Self, SyncError> {
        let id = data
            .id
            .filter(|id| !id.as_str().is_empty())
            .ok_or_else(|| SyncError::MalformedNotification("missing mission id".to_string()))?;
        if tapped {
            return Ok(NotificationEvent::Tapped { id });
        }
        let payload = data.payload.ok_or_else(|| {
            SyncError::MalformedNotification(format!("mission {id} has no payload"))
        })?;
        Ok(NotificationEvent::NewMission { id, payload })
    }

    pub fn mission_id(&self) -> &MissionId {
        match self {
            NotificationEvent::NewMission { id, .. } | NotificationEvent::Tapped { id } => id,
        }
    }
}

pub(crate) fn parse_payload(payload: Value) -> Result<MissionPayload, serde_json::Error> {
    match payload {
        Value::String(raw) => serde_json::from_str(&raw),
        other => serde_json::from_value(other),
    }
}

/// What happened to a notification.
#[derive(Debug, Clone, PartialEq)]
pub enum IntakeOutcome {
    /// A new `unopened` mission was stored.
    Stored(Mission),
    /// The id was already stored; nothing changed.
    Duplicate,
    /// The payload could not be parsed; nothing changed.
    Dropped { reason: String },
    /// The caller should show this mission.
    ViewRequested(MissionId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewOrigin {
    Remote,
    Cache,
}

/// Result of a single-mission lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum MissionView {
    Found {
        mission: Mission,
        origin: ViewOrigin,
        /// Outcome of the backend open call, when the lookup opened the
        /// mission.
        open_ack: Option<Result<(), GatewayError>>,
    },
    /// Neither the backend nor the local store knows this id.
    Missing,
}

impl MissionView {
    pub fn mission(&self) -> Option<&Mission> {
        match self {
            MissionView::Found { mission, .. } => Some(mission),
            MissionView::Missing => None,
        }
    }
}
