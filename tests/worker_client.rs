//! Worker client against a mock worker.

use worker_gateway::config::WorkerConfig;
use worker_gateway::resilience::DownstreamError;
use worker_gateway::worker::{AudioChunk, ModerationRequest, WorkerClient};

mod common;

fn client(addr: std::net::SocketAddr) -> WorkerClient {
    WorkerClient::new(&WorkerConfig {
        base_url: format!("http://{addr}"),
        api_key: "dev-secret".into(),
        ..WorkerConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_transcribe_sends_audio_and_session_headers() {
    let (addr, mut requests) = common::start_mock_worker(|_| async {
        (
            200,
            r#"{"status":"ok","final":{"text":"xin chao","words":[]},"detections":[]}"#.to_string(),
        )
    })
    .await;

    let response = client(addr)
        .transcribe(AudioChunk {
            session_id: "s1".into(),
            data: vec![1, 2, 3, 4],
            is_final: true,
        })
        .await
        .unwrap();

    assert_eq!(response.status, "ok");
    assert_eq!(response.final_result.unwrap().text, "xin chao");

    let request = requests.recv().await.unwrap();
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/asr/stream");
    assert_eq!(request.header("x-api-key"), Some("dev-secret"));
    assert_eq!(request.header("x-session-id"), Some("s1"));
    assert_eq!(request.header("x-final"), Some("true"));
    assert_eq!(request.header("content-type"), Some("application/octet-stream"));
    assert_eq!(request.body, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_partial_chunk_omits_final_header() {
    let (addr, mut requests) =
        common::start_mock_worker(|_| async { (200, r#"{"partial":{"text":"xin"}}"#.to_string()) }).await;

    let response = client(addr)
        .transcribe(AudioChunk {
            session_id: "s2".into(),
            data: vec![0; 16],
            is_final: false,
        })
        .await
        .unwrap();

    assert_eq!(response.partial.unwrap().text, "xin");
    assert_eq!(requests.recv().await.unwrap().header("x-final"), None);
}

#[tokio::test]
async fn test_moderate_posts_inputs() {
    let (addr, mut requests) = common::start_mock_worker(|_| async {
        (
            200,
            r#"{"results":[{"label":"safe","score":0.98},{"label":"block","score":0.95}]}"#.to_string(),
        )
    })
    .await;

    let response = client(addr)
        .moderate(ModerationRequest {
            inputs: vec!["hello".into(), "bad words".into()],
        })
        .await
        .unwrap();

    assert_eq!(response.results.len(), 2);
    assert_eq!(response.results[1].label, "block");

    let request = requests.recv().await.unwrap();
    assert_eq!(request.path, "/moderation");
    assert_eq!(request.json(), serde_json::json!({"inputs": ["hello", "bad words"]}));
}

#[tokio::test]
async fn test_error_status_maps_to_status_error() {
    let (addr, _requests) =
        common::start_mock_worker(|_| async { (503, r#"{"detail":"overloaded"}"#.to_string()) }).await;

    let err = client(addr)
        .moderate(ModerationRequest { inputs: vec!["hi".into()] })
        .await
        .unwrap_err();

    assert_eq!(
        err,
        DownstreamError::Status {
            status: 503,
            body: r#"{"detail":"overloaded"}"#.into()
        }
    );
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let (addr, _requests) = common::start_mock_worker(|_| async { (200, "not json".to_string()) }).await;
    let err = client(addr)
        .moderate(ModerationRequest { inputs: vec!["hi".into()] })
        .await
        .unwrap_err();
    assert!(matches!(err, DownstreamError::Decode(_)));
}

#[tokio::test]
async fn test_healthz_requires_ok_status() {
    let (addr, mut requests) =
        common::start_mock_worker(|_| async { (200, r#"{"status":"degraded"}"#.to_string()) }).await;

    let err = client(addr).healthz().await.unwrap_err();
    assert!(matches!(err, DownstreamError::Failed(_)));

    let request = requests.recv().await.unwrap();
    assert_eq!((request.method.as_str(), request.path.as_str()), ("GET", "/healthz"));
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let addr = common::closed_port().await;
    let err = client(addr).healthz().await.unwrap_err();
    assert!(matches!(err, DownstreamError::Transport(_)));
}
