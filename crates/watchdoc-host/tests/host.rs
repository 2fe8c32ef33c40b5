//! Host integration tests.
//!
//! Routes are exercised through `tower::ServiceExt` without binding a socket;
//! the lifecycle tests run real TCP probes against a wiremock receiver.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tokio::net::TcpListener;
use tower::ServiceExt;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use watchdoc_core::WatchConfig;
use watchdoc_host::app::build_app;
use watchdoc_host::{serve_with_module, ModuleError, WatchDoctor};

async fn receiver() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    server
}

async fn dead_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr.to_string()
}

fn idle_module() -> WatchDoctor {
    WatchDoctor::new(WatchConfig::new("127.0.0.1:9"))
}

#[tokio::test]
async fn health_returns_ok() {
    let app = build_app(&idle_module());
    let resp = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn unknown_route_passes_through_to_fallback() {
    let app = build_app(&idle_module());
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/orders")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn lifecycle_reports_down_backend() {
    let server = receiver().await;
    let down = dead_address().await;
    let config = WatchConfig::from_directive("50ms", "40ms", &server.uri(), &format!("http://{down}"))
        .unwrap();

    let mut module = WatchDoctor::new(config);
    module.provision();
    module.validate().await.unwrap();

    let mut requests = Vec::new();
    for _ in 0..40 {
        tokio::time::sleep(Duration::from_millis(25)).await;
        requests = server.received_requests().await.unwrap();
        if !requests.is_empty() {
            break;
        }
    }
    assert_eq!(module.cleanup().await, 1);

    assert!(!requests.is_empty(), "no notification received");
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["type"], "Down");
    assert_eq!(body["server"], down.as_str());
}

#[tokio::test]
async fn unreachable_notification_server_blocks_activation() {
    let endpoint = dead_address().await;
    let down = dead_address().await;
    let config = WatchConfig::from_directive("50ms", "40ms", &endpoint, &down).unwrap();

    let mut module = WatchDoctor::new(config);
    module.provision();
    let err = module.validate().await.unwrap_err();
    assert!(matches!(err, ModuleError::Watch(_)));
    assert_eq!(module.cleanup().await, 0);
}

#[tokio::test]
async fn serve_refuses_to_start_with_empty_endpoint() {
    let module = WatchDoctor::new(WatchConfig::new(""));
    let result = serve_with_module("127.0.0.1:0".parse().unwrap(), module, async {}).await;
    let err = result.unwrap_err();
    assert!(err.to_string().contains("No notification server given"), "{err}");
}

#[tokio::test]
async fn serve_runs_until_shutdown() {
    let server = receiver().await;
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let up = listener.local_addr().unwrap().to_string();
    let config = WatchConfig::from_directive("50ms", "40ms", &server.uri(), &up).unwrap();

    let shutdown = async {
        tokio::time::sleep(Duration::from_millis(150)).await;
    };
    tokio::time::timeout(
        Duration::from_secs(2),
        serve_with_module("127.0.0.1:0".parse().unwrap(), WatchDoctor::new(config), shutdown),
    )
    .await
    .expect("server should stop on shutdown")
    .unwrap();

    assert!(server.received_requests().await.unwrap().is_empty());
    drop(listener);
}
