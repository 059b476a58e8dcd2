//! Admin API served on a real listener.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::net::TcpListener;
use worker_gateway::admin::{self, AdminState};
use worker_gateway::config::GatewayConfig;
use worker_gateway::lifecycle::Shutdown;
use worker_gateway::observability::metrics;
use worker_gateway::resilience::scheduler::ManualScheduler;
use worker_gateway::worker;

mod common;

const KEY: &str = "test-admin-key";

#[tokio::test]
async fn test_operator_workflow_and_prometheus_export() {
    let prometheus = metrics::init_metrics().unwrap();

    let (worker_addr, _requests) = common::start_mock_worker(|request| async move {
        match request.path.as_str() {
            "/healthz" => (200, r#"{"status":"ok"}"#.to_string()),
            _ => (500, "{}".to_string()),
        }
    })
    .await;

    let mut config = GatewayConfig::default();
    config.worker.base_url = format!("http://{worker_addr}");
    config.worker.service_name = "admin-e2e".into();
    let service = Arc::new(worker::guarded_worker_with(&config, Arc::new(ManualScheduler::new())).unwrap());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let admin_addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let state = AdminState::new(service.clone(), KEY).with_prometheus(prometheus);
    let server = tokio::spawn(admin::serve(listener, state, shutdown.subscribe()));

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let base = format!("http://{admin_addr}");

    let unauthorized = client.get(format!("{base}/admin/breaker/metrics")).send().await.unwrap();
    assert_eq!(unauthorized.status(), 401);

    let tripped: Value = client
        .post(format!("{base}/admin/breaker/trip"))
        .bearer_auth(KEY)
        .json(&json!({"reason": "worker redeploy"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(tripped, json!({"state": "open", "reason": "worker redeploy"}));

    let exposition = client.get(format!("{base}/metrics")).send().await.unwrap().text().await.unwrap();
    assert!(exposition.contains("circuit_breaker_state{service=\"admin-e2e\"} 1"));

    let health: Value = client
        .get(format!("{base}/admin/breaker/health"))
        .bearer_auth(KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["healthy"], true);

    let reset: Value = client
        .post(format!("{base}/admin/breaker/reset"))
        .bearer_auth(KEY)
        .json(&json!({"reason": "redeploy done"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(reset["state"], "closed");

    let events: Value = client
        .get(format!("{base}/admin/breaker/events?limit=10"))
        .bearer_auth(KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(events["total"], 2);
    assert_eq!(events["events"][0]["type"], "manual_trip");
    assert_eq!(events["events"][1]["type"], "manual_reset");

    let bad = client
        .post(format!("{base}/admin/breaker/trip"))
        .bearer_auth(KEY)
        .json(&json!({"reason": ""}))
        .send()
        .await
        .unwrap();
    assert_eq!(bad.status(), 400);

    drop(client);
    shutdown.trigger();
    server.await.unwrap().unwrap();
}
