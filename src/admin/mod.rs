//! Operator control surface for the worker breaker.
//!
//! Everything under `/admin` requires the admin bearer key; `/metrics` is
//! left open for scrapers.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::resilience::BreakerControl;

#[derive(Clone)]
pub struct AdminState {
    pub control: Arc<dyn BreakerControl>,
    pub api_key: Arc<str>,
    pub prometheus: Option<PrometheusHandle>,
}

impl AdminState {
    pub fn new(control: Arc<dyn BreakerControl>, api_key: &str) -> Self {
        Self {
            control,
            api_key: Arc::from(api_key),
            prometheus: None,
        }
    }

    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    let admin = Router::new()
        .route("/admin/breaker/metrics", get(get_metrics))
        .route("/admin/breaker/trip", post(trip))
        .route("/admin/breaker/reset", post(reset))
        .route("/admin/breaker/events", get(get_events))
        .route("/admin/breaker/health", get(get_health))
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware));

    Router::new()
        .merge(admin)
        .route("/metrics", get(get_prometheus))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the admin router until the shutdown signal fires.
pub async fn serve(
    listener: TcpListener,
    state: AdminState,
    mut shutdown: broadcast::Receiver<()>,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "Admin API listening");

    axum::serve(listener, setup_admin_router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await
}
