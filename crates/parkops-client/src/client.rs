use reqwest::header::{ACCEPT_LANGUAGE, AUTHORIZATION};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use parkops_core::{normalize_server_url, GatewayError, Locale};
use parkops_proto::ApiErrorBody;

/// Thin wrapper over `reqwest` that knows the backend's base URL, bearer
/// token and display language.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
    locale: Locale,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let normalized = normalize_server_url(base_url);
        let base_url = Url::parse(&normalized).map_err(|e| {
            GatewayError::Transport(format!("invalid server URL '{normalized}': {e}"))
        })?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url,
            token: None,
            locale: Locale::default(),
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Absolute URL for a backend path such as `/api/missions`. Any path
    /// prefix of the base URL is kept.
    pub fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined).map_err(|e| GatewayError::Transport(format!("invalid URL {joined}: {e}")))
    }

    /// Absolute URL for a path given as separate segments. Each segment is
    /// percent-encoded, so an opaque id can never add path components, a
    /// query or a fragment.
    pub fn endpoint_segments<I>(&self, segments: I) -> Result<Url, GatewayError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                GatewayError::Transport(format!("server URL {} cannot hold a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, GatewayError> {
        Ok(self.request_url(method, self.endpoint(path)?))
    }

    pub(crate) fn request_url(&self, method: Method, url: Url) -> RequestBuilder {
        let mut builder = self
            .http
            .request(method, url)
            .header(ACCEPT_LANGUAGE, self.locale.as_str());
        if let Some(token) = &self.token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        builder
    }

    /// Send a request. Non-success answers become errors whose message comes
    /// from the `{"error": ..}` body, or `fallback` when there is none.
    pub(crate) async fn send(
        &self,
        builder: RequestBuilder,
        fallback: &str,
    ) -> Result<Response, GatewayError> {
        let response = builder.send().await.map_err(transport)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .ok()
            .and_then(ApiErrorBody::into_message)
            .unwrap_or_else(|| fallback.to_string());
        tracing::debug!(status = status.as_u16(), %message, "backend rejected request");

        Err(match status {
            StatusCode::NOT_FOUND => GatewayError::NotFound(message),
            StatusCode::UNAUTHORIZED => GatewayError::Unauthenticated(message),
            _ => GatewayError::Status {
                status: status.as_u16(),
                message,
            },
        })
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        fallback: &str,
    ) -> Result<T, GatewayError> {
        let response = self.send(builder, fallback).await?;
        let bytes = response.bytes().await.map_err(transport)?;
        serde_json::from_slice(&bytes).map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

pub(crate) fn transport(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Transport(format!("request timed out: {err}"))
    } else {
        GatewayError::Transport(err.to_string())
    }
}
