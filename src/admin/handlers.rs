use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::resilience::{BreakerEvent, CircuitState, ControlError, HealthResult, MetricsSnapshot};

const DEFAULT_EVENT_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct ReasonBody {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct ControlResponse {
    pub state: CircuitState,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub events: Vec<BreakerEvent>,
    pub total: usize,
}

/// Control errors rendered as `400 {"error": ...}`.
pub struct AdminError(ControlError);

impl From<ControlError> for AdminError {
    fn from(err: ControlError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.0.to_string() });
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

pub async fn get_metrics(State(state): State<AdminState>) -> Json<MetricsSnapshot> {
    Json(state.control.metrics())
}

pub async fn trip(
    State(state): State<AdminState>,
    Json(body): Json<ReasonBody>,
) -> Result<Json<ControlResponse>, AdminError> {
    let next = state.control.trip(&body.reason)?;
    Ok(Json(ControlResponse {
        state: next,
        reason: body.reason.trim().to_string(),
    }))
}

pub async fn reset(
    State(state): State<AdminState>,
    Json(body): Json<ReasonBody>,
) -> Result<Json<ControlResponse>, AdminError> {
    let next = state.control.reset(&body.reason)?;
    Ok(Json(ControlResponse {
        state: next,
        reason: body.reason.trim().to_string(),
    }))
}

pub async fn get_events(
    State(state): State<AdminState>,
    Query(query): Query<EventsQuery>,
) -> Json<EventsResponse> {
    let (events, total) = state
        .control
        .recent_events(query.limit.unwrap_or(DEFAULT_EVENT_LIMIT));
    Json(EventsResponse { events, total })
}

pub async fn get_health(State(state): State<AdminState>) -> Json<HealthResult> {
    Json(state.control.check_health().await)
}

/// Prometheus text exposition.
pub async fn get_prometheus(State(state): State<AdminState>) -> Response {
    match &state.prometheus {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}
