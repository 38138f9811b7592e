//! HTTP route tests driven through `tower::ServiceExt::oneshot`.

mod common;

use algosync_runner::config::runner::ServerConfig;
use algosync_runner::http::{router, state::AppState};
use algosync_runner::ExecutionCoordinator;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

fn app() -> (Router, TempDir) {
    let root = tempfile::tempdir().unwrap();
    let coordinator = common::shell_coordinator(root.path(), true);
    let state = AppState::new(coordinator, ServerConfig::default());
    (router(state), root)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_run_js_success() {
    let (app, _root) = app();
    let (status, body) = send(app, post_json("/run-js", json!({ "code": "echo ok" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "output": "ok\n" }));
}

#[tokio::test]
async fn test_compiler_prefix_is_mounted() {
    let (app, _root) = app();
    let (status, body) = send(
        app,
        post_json("/api/compiler/run-js", json!({ "code": "echo nested" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["output"], "nested\n");
}

#[tokio::test]
async fn test_run_js_failure_reports_stderr() {
    let (app, root) = app();
    let (status, body) = send(
        app,
        post_json("/run-js", json!({ "code": "echo broken >&2; exit 1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": false, "output": "broken\n" }));
    assert_eq!(common::workspace_count(root.path()), 0);
}

#[tokio::test]
async fn test_stdin_is_forwarded() {
    let (app, _root) = app();
    let (_, body) = send(
        app,
        post_json("/run-js", json!({ "code": "read line; echo got:$line", "stdin": "abc\n" })),
    )
    .await;
    assert_eq!(body["output"], "got:abc\n");
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let (app, _root) = app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/run-python")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"code\": "))
        .unwrap();
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_missing_code_field_is_bad_request() {
    let (app, _root) = app();
    let (status, _) = send(app, post_json("/run-cpp", json!({ "source": "x" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_execute_returns_full_result() {
    let (app, _root) = app();
    let (status, body) = send(
        app,
        post_json("/api/execute", json!({ "language": "js", "code": "echo hi; exit 3" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["succeeded"], false);
    assert_eq!(body["failure_stage"], "run");
    assert_eq!(body["exit_code"], 3);
    assert_eq!(body["stdout"], "hi\n");
    assert!(body["run_id"].is_string());
}

#[tokio::test]
async fn test_execute_unknown_language() {
    let (app, _root) = app();
    let (status, body) = send(
        app,
        post_json("/api/execute", json!({ "language": "cobol", "code": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Unsupported language: cobol");
}

#[tokio::test]
async fn test_health_and_root() {
    let (app, _root) = app();
    let request = Request::builder()
        .uri("/api/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app.clone(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Server is running");
    assert_eq!(body["environment"], "development");
    assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Welcome to AlgoSync API");
}

#[tokio::test]
async fn test_cors_preflight_allows_dev_origin() {
    let (app, _root) = app();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/run-js")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some("http://localhost:3000")
    );
}

#[tokio::test]
async fn test_cors_rejects_unknown_origin() {
    let (app, _root) = app();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/run-js")
        .header(header::ORIGIN, "https://evil.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_executions_respect_cap() {
    let root = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let log = scratch.path().join("slots.log");

    let mut config = common::test_config(root.path());
    config.toolchains.node = "/bin/sh".to_string();
    config.max_concurrent_executions = 2;
    let coordinator = ExecutionCoordinator::new(config).unwrap();
    let app = router(AppState::new(coordinator, ServerConfig::default()));

    let script = format!(
        "echo + >> '{log}'; sleep 0.3; echo - >> '{log}'",
        log = log.display()
    );
    let handles: Vec<_> = (0..6)
        .map(|_| {
            let app = app.clone();
            let request = post_json("/run-js", json!({ "code": &script }));
            tokio::spawn(send(app, request))
        })
        .collect();
    for handle in handles {
        let (status, body) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true, "{body}");
    }

    let events = std::fs::read_to_string(&log).unwrap();
    let mut running = 0i32;
    let mut peak = 0;
    for event in events.lines() {
        running += if event == "+" { 1 } else { -1 };
        peak = peak.max(running);
    }
    assert_eq!(events.lines().count(), 12);
    assert_eq!(running, 0);
    assert!((1..=2).contains(&peak), "{peak} executions overlapped");
    assert_eq!(common::workspace_count(root.path()), 0);
}
