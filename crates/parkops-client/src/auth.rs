use reqwest::Method;
use std::time::Duration;

use crate::client::ApiClient;
use parkops_core::{normalize_server_url, GatewayError, Session};
use parkops_proto::{HealthResponse, LoginRequest, LoginResponse, PushTokenRequest};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The backend refused the request; the message is meant for the operator.
    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Server selection, login and push-token endpoints.
#[derive(Debug, Clone)]
pub struct AuthApi {
    client: ApiClient,
}

impl AuthApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Whether `url` points at a reachable parkops backend. Any failure,
    /// including a slow answer, counts as invalid.
    pub async fn validate_server_url(url: &str, timeout: Duration) -> bool {
        let url = normalize_server_url(url);
        let client = match ApiClient::new(&url, timeout) {
            Ok(client) => client,
            Err(err) => {
                tracing::debug!(%url, error = %err, "server URL rejected");
                return false;
            }
        };
        let request = match client.request(Method::GET, "/health") {
            Ok(request) => request,
            Err(_) => return false,
        };
        match client
            .send_json::<HealthResponse>(request, "Health check failed")
            .await
        {
            Ok(health) => health.is_ok(),
            Err(err) => {
                tracing::debug!(%url, error = %err, "health check failed");
                false
            }
        }
    }

    /// Exchange credentials for a session. Saving it is up to the caller.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        let request = self
            .client
            .request(Method::POST, "/auth/login")?
            .json(&LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            });
        let response: LoginResponse = self
            .client
            .send_json(request, "Login failed")
            .await
            .map_err(rejected)?;
        tracing::info!(operator = %response.user.id, "logged in");
        Ok(Session::new(response.token, response.user))
    }

    pub async fn register_push_token(&self, session: &Session, token: &str) -> Result<(), AuthError> {
        self.push_token(Method::POST, session, token, "Failed to register push token")
            .await
    }

    pub async fn remove_push_token(&self, session: &Session, token: &str) -> Result<(), AuthError> {
        self.push_token(Method::DELETE, session, token, "Failed to remove push token")
            .await
    }

    async fn push_token(
        &self,
        method: Method,
        session: &Session,
        token: &str,
        fallback: &str,
    ) -> Result<(), AuthError> {
        let path = format!("/api/users/{}/push-token", session.operator.id);
        let client = self.client.clone().with_token(session.token.clone());
        let request = client.request(method, &path)?.json(&PushTokenRequest {
            token: token.to_string(),
        });
        client.send(request, fallback).await.map_err(rejected)?;
        Ok(())
    }
}

/// Backend refusals carry an operator-facing message; transport problems
/// stay gateway errors.
fn rejected(err: GatewayError) -> AuthError {
    match err {
        GatewayError::Status { message, .. }
        | GatewayError::NotFound(message)
        | GatewayError::Unauthenticated(message) => AuthError::Rejected(message),
        other => AuthError::Gateway(other),
    }
}
