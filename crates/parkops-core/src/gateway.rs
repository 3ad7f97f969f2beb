use async_trait::async_trait;
use std::sync::Arc;

use crate::error::GatewayError;
use parkops_proto::{Mission, MissionId, MissionPage, MissionUpdate};

/// The remote side of mission synchronization.
///
/// Implementations are expected to be already reliable or to fail
/// explicitly; retries and backoff are not part of this contract. A
/// `404`-style answer must be reported as [`GatewayError::NotFound`] so the
/// synchronizer can tell "missing" apart from "unreachable".
#[async_trait]
pub trait MissionGateway: Send + Sync {
    /// Fetch one page of the operator's missions, in backend order.
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<MissionPage, GatewayError>;

    async fn fetch_one(&self, id: &MissionId) -> Result<Mission, GatewayError>;

    /// Tell the backend the operator opened the mission.
    async fn mark_opened(&self, id: &MissionId) -> Result<(), GatewayError>;

    async fn submit_update(&self, id: &MissionId, update: &MissionUpdate)
        -> Result<(), GatewayError>;
}

#[async_trait]
impl<G: MissionGateway + ?Sized> MissionGateway for Arc<G> {
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<MissionPage, GatewayError> {
        (**self).fetch_page(page, page_size).await
    }

    async fn fetch_one(&self, id: &MissionId) -> Result<Mission, GatewayError> {
        (**self).fetch_one(id).await
    }

    async fn mark_opened(&self, id: &MissionId) -> Result<(), GatewayError> {
        (**self).mark_opened(id).await
    }

    async fn submit_update(
        &self,
        id: &MissionId,
        update: &MissionUpdate,
    ) -> Result<(), GatewayError> {
        (**self).submit_update(id, update).await
    }
}
