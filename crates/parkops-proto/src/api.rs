use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::mission::{Mission, MissionId, MissionPage, Pagination};

identifier!(
    /// Backend user identifier.
    OperatorId
);

/// The logged-in field operator as returned by the login endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operator {
    pub id: OperatorId,
    pub username: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Operator {
    pub fn new(id: impl Into<OperatorId>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: Operator,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushTokenRequest {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Error body returned by the backend on non-2xx responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.error.or(self.message).filter(|m| !m.trim().is_empty())
    }
}

/// Response of `GET /api/missions`. Older backends return a bare array
/// without paging metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MissionListResponse {
    Paged {
        data: Vec<Mission>,
        pagination: Pagination,
    },
    Bare(Vec<Mission>),
}

impl MissionListResponse {
    pub fn into_page(self, requested_page: u32) -> MissionPage {
        match self {
            MissionListResponse::Paged { data, pagination } => MissionPage {
                missions: data,
                pagination,
            },
            MissionListResponse::Bare(missions) => MissionPage {
                missions,
                pagination: Pagination {
                    page: requested_page,
                    total_pages: requested_page,
                    has_next_page: false,
                },
            },
        }
    }
}

/// Data block of a push notification as delivered by the push service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PushData {
    #[serde(default)]
    pub id: Option<MissionId>,
    /// Either a JSON object or a JSON-encoded string.
    #[serde(default)]
    pub payload: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_response_accepts_envelope_and_bare_array() {
        let paged: MissionListResponse = serde_json::from_value(json!({
            "data": [{"missionId": "a"}],
            "pagination": {"page": 2, "totalPages": 3, "hasNextPage": true}
        }))
        .unwrap();
        let page = paged.into_page(2);
        assert_eq!(page.missions.len(), 1);
        assert!(page.pagination.has_next_page);
        assert_eq!(page.pagination.total_pages, 3);

        let bare: MissionListResponse =
            serde_json::from_value(json!([{"missionId": "a"}, {"missionId": "b"}])).unwrap();
        let page = bare.into_page(1);
        assert_eq!(page.missions.len(), 2);
        assert_eq!(page.pagination.page, 1);
        assert!(!page.pagination.has_next_page);
    }

    #[test]
    fn operator_id_may_be_numeric() {
        let login: LoginResponse = serde_json::from_value(json!({
            "token": "t0k",
            "user": {"id": 17, "username": "nadia", "role": "field"}
        }))
        .unwrap();
        assert_eq!(login.user.id.as_str(), "17");
        assert_eq!(login.user.extra.get("role"), Some(&json!("field")));
    }

    #[test]
    fn error_body_prefers_error_field() {
        let body: ApiErrorBody =
            serde_json::from_value(json!({"error": "Mission locked", "message": "x"})).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("Mission locked"));
        assert_eq!(ApiErrorBody::default().into_message(), None);
    }
}
