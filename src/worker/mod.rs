//! AI worker integration.
//!
//! Wires the typed HTTP client into a [`GuardedService`]: every worker call
//! goes through the primary breaker, `/healthz` through the health breaker.

pub mod client;
pub mod types;

use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::config::GatewayConfig;
use crate::resilience::operations::Operation;
use crate::resilience::scheduler::{Scheduler, TokioScheduler};
use crate::resilience::{BreakerError, DownstreamError, GuardedService};

pub use client::{ClientError, WorkerClient};
pub use types::{
    AsrResponse, AudioChunk, ModerationRequest, ModerationResponse, WorkerRequest, WorkerResponse,
};

pub const TRANSCRIBE: &str = "transcribe";
pub const MODERATE: &str = "moderate";

pub type WorkerService = GuardedService<WorkerRequest, WorkerResponse>;

/// Build the guarded worker with reset timers on the Tokio runtime.
pub fn guarded_worker(config: &GatewayConfig) -> Result<WorkerService, ClientError> {
    guarded_worker_with(config, Arc::new(TokioScheduler))
}

pub fn guarded_worker_with(
    config: &GatewayConfig,
    scheduler: Arc<dyn Scheduler>,
) -> Result<WorkerService, ClientError> {
    let client = WorkerClient::new(&config.worker)?;

    Ok(WorkerService::builder(config.worker.service_name.clone())
        .breaker_config(config.breaker.clone())
        .health_config(config.health_breaker.clone())
        .retry_config(config.retry.clone())
        .enabled(config.enabled)
        .scheduler(scheduler)
        .operation(TRANSCRIBE, WorkerOperation::new(TRANSCRIBE, client.clone()))
        .operation(MODERATE, WorkerOperation::new(MODERATE, client.clone()))
        .health_probe(move |_: ()| {
            let client = client.clone();
            async move { client.healthz().await.map(|_| ()) }
        })
        .build())
}

/// One worker endpoint, registered under the id of the request it serves.
struct WorkerOperation {
    id: &'static str,
    client: WorkerClient,
}

impl WorkerOperation {
    fn new(id: &'static str, client: WorkerClient) -> Self {
        Self { id, client }
    }
}

impl Operation<WorkerRequest, WorkerResponse> for WorkerOperation {
    fn call(&self, request: WorkerRequest) -> BoxFuture<'static, Result<WorkerResponse, DownstreamError>> {
        let client = self.client.clone();
        Box::pin(async move {
            match request {
                WorkerRequest::Transcribe(chunk) => client.transcribe(chunk).await.map(WorkerResponse::Transcription),
                WorkerRequest::Moderate(body) => client.moderate(body).await.map(WorkerResponse::Moderation),
            }
        })
    }

    fn check(&self, request: &WorkerRequest) -> Result<(), String> {
        if request.operation_id() == self.id {
            Ok(())
        } else {
            Err(format!("expected a '{}' request, got '{}'", self.id, request.operation_id()))
        }
    }
}

/// Transcribe one audio chunk. Not retried: the worker keeps per-session state.
pub async fn transcribe(service: &WorkerService, chunk: AudioChunk) -> Result<AsrResponse, BreakerError> {
    match service.execute_call(TRANSCRIBE, WorkerRequest::Transcribe(chunk)).await? {
        WorkerResponse::Transcription(response) => Ok(response),
        other => Err(unexpected(&other)),
    }
}

/// Classify texts, retrying transient failures with backoff.
pub async fn moderate(service: &WorkerService, inputs: Vec<String>) -> Result<ModerationResponse, BreakerError> {
    let request = WorkerRequest::Moderate(ModerationRequest { inputs });
    match service.execute_with_default_retry(MODERATE, request).await? {
        WorkerResponse::Moderation(response) => Ok(response),
        other => Err(unexpected(&other)),
    }
}

fn unexpected(response: &WorkerResponse) -> BreakerError {
    BreakerError::Downstream(DownstreamError::Decode(format!("unexpected worker response: {response:?}")))
}
