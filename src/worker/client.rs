//! HTTP client for the AI worker.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;

use crate::config::WorkerConfig;
use crate::resilience::DownstreamError;
use crate::worker::types::{AsrResponse, AudioChunk, HealthzResponse, ModerationRequest, ModerationResponse};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid worker base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Thin typed wrapper over the worker's endpoints.
///
/// Call deadlines are enforced by the circuit breaker, not here; the client
/// only bounds connection setup.
#[derive(Debug, Clone)]
pub struct WorkerClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl WorkerClient {
    pub fn new(config: &WorkerConfig) -> Result<Self, ClientError> {
        url::Url::parse(&config.base_url)?;
        // The worker sits on the internal network; never route it via a system proxy.
        let http = reqwest::Client::builder()
            .no_proxy()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST /asr/stream`
    pub async fn transcribe(&self, chunk: AudioChunk) -> Result<AsrResponse, DownstreamError> {
        let mut request = self
            .http
            .post(self.url("/asr/stream"))
            .header(CONTENT_TYPE, "application/octet-stream")
            .header("x-session-id", chunk.session_id);
        if chunk.is_final {
            request = request.header("x-final", "true");
        }
        self.send(request.body(chunk.data)).await
    }

    /// `POST /moderation`
    pub async fn moderate(&self, request: ModerationRequest) -> Result<ModerationResponse, DownstreamError> {
        self.send(self.http.post(self.url("/moderation")).json(&request)).await
    }

    /// `GET /healthz`. Any status other than `ok` counts as a failure.
    pub async fn healthz(&self) -> Result<HealthzResponse, DownstreamError> {
        let health: HealthzResponse = self.send(self.http.get(self.url("/healthz"))).await?;
        if health.status != "ok" {
            return Err(DownstreamError::failed(format!("worker reported status '{}'", health.status)));
        }
        Ok(health)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<R: DeserializeOwned>(&self, request: RequestBuilder) -> Result<R, DownstreamError> {
        let response = request
            .header("x-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| DownstreamError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(status = %status, body = %body, "Worker returned error status");
            return Err(DownstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| DownstreamError::Decode(e.to_string()))
    }
}
