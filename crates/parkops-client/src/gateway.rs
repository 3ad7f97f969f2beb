use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::Serialize;

use crate::client::ApiClient;
use parkops_core::{GatewayError, MissionGateway, Session};
use parkops_proto::{Mission, MissionId, MissionListResponse, MissionPage, MissionUpdate};

#[derive(Serialize)]
struct ListQuery<'a> {
    username: &'a str,
    page: u32,
    limit: u32,
}

/// [`MissionGateway`] backed by the parkops REST API, acting for one
/// logged-in operator.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: ApiClient,
    username: String,
}

impl HttpGateway {
    pub fn new(client: ApiClient, session: &Session) -> Self {
        Self {
            client: client.with_token(session.token.clone()),
            username: session.operator.username.clone(),
        }
    }

    /// Request against `/api/missions/{id}[/{action}]`.
    fn mission_request(
        &self,
        method: Method,
        id: &MissionId,
        action: Option<&str>,
    ) -> Result<RequestBuilder, GatewayError> {
        let mut segments = vec!["api", "missions", id.as_str()];
        segments.extend(action);
        let url = self.client.endpoint_segments(segments)?;
        Ok(self.client.request_url(method, url))
    }
}

#[async_trait]
impl MissionGateway for HttpGateway {
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<MissionPage, GatewayError> {
        let request = self
            .client
            .request(Method::GET, "/api/missions")?
            .query(&ListQuery {
                username: &self.username,
                page,
                limit: page_size,
            });
        let list: MissionListResponse = self
            .client
            .send_json(request, "Failed to fetch missions")
            .await?;
        let page = list.into_page(page);
        tracing::debug!(
            page = page.pagination.page,
            count = page.missions.len(),
            has_next_page = page.pagination.has_next_page,
            "fetched mission page"
        );
        Ok(page)
    }

    async fn fetch_one(&self, id: &MissionId) -> Result<Mission, GatewayError> {
        let request = self.mission_request(Method::GET, id, None)?;
        self.client
            .send_json(request, "Failed to fetch mission")
            .await
    }

    async fn mark_opened(&self, id: &MissionId) -> Result<(), GatewayError> {
        let request = self.mission_request(Method::POST, id, Some("open"))?;
        self.client.send(request, "Failed to open mission").await?;
        Ok(())
    }

    async fn submit_update(
        &self,
        id: &MissionId,
        update: &MissionUpdate,
    ) -> Result<(), GatewayError> {
        let request = self
            .mission_request(Method::POST, id, Some("update"))?
            .json(update);
        self.client.send(request, "Failed to update mission").await?;
        Ok(())
    }
}
