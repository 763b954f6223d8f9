//! Integration tests for the HTTP gateway

mod mocks;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use mocks::{session_with, stream_dir, ScriptLauncher, ScriptedEnumerator, TEST_MANIFEST, TEST_SEGMENT};
use projector_core::gateway::{router, GatewayState};
use projector_core::CaptureSession;
use serde_json::Value;
use tower::ServiceExt;

const HOST: &str = "192.168.1.20";
const PORT: u16 = 8000;

fn gateway(session: &CaptureSession, enumerator: ScriptedEnumerator) -> Router {
    let state = GatewayState::new(session.clone(), Arc::new(enumerator), PORT)
        .with_advertise_host(HOST)
        .with_default_source("3");
    router(state)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Option<&str>) -> Request<Body> {
    let builder = Request::builder().method("POST").uri(uri);
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, body.to_vec())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, _, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_share_and_stop_scenario() {
    let (_tmp, dir) = stream_dir();
    let session = session_with(&dir, ScriptLauncher::streaming(&dir));
    let app = gateway(&session, ScriptedEnumerator::two_screens());

    let (status, body) = send_json(&app, get("/api/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["running"], false);
    assert_eq!(body["state"], "idle");
    assert_eq!(body["ip"], HOST);
    assert!(body["viewer_url"].is_null());

    let (status, body) = send_json(&app, post("/api/start", Some(r#"{"id":"1"}"#))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["url"], "http://192.168.1.20:8000");
    assert_eq!(body["ip"], HOST);

    let (_, body) = send_json(&app, get("/api/status")).await;
    assert_eq!(body["running"], true);
    assert_eq!(body["state"], "running");
    assert_eq!(body["source"], "1");
    assert_eq!(body["viewer_url"], "http://192.168.1.20:8000");

    let (status, headers, bytes) = send(&app, get("/hls/manifest")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/vnd.apple.mpegurl");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(bytes, TEST_MANIFEST.as_bytes());

    let (status, headers, bytes) = send(&app, get("/hls/seg000.ts")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "video/mp2t");
    assert_eq!(bytes, TEST_SEGMENT);

    let (status, body) = send_json(&app, post("/api/stop", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["forced"], false);

    let (_, body) = send_json(&app, get("/api/status")).await;
    assert_eq!(body["running"], false);
    assert!(body["viewer_url"].is_null());

    let (status, _, _) = send(&app, get("/hls/manifest")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_start_without_body_uses_default_source() {
    let (_tmp, dir) = stream_dir();
    let session = session_with(&dir, ScriptLauncher::streaming(&dir));
    let app = gateway(&session, ScriptedEnumerator::two_screens());

    let (status, _) = send_json(&app, post("/api/start", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session.snapshot().source_id.as_deref(), Some("3"));

    session.stop().await.unwrap();
}

#[tokio::test]
async fn test_numeric_source_id_is_honoured() {
    let (_tmp, dir) = stream_dir();
    let session = session_with(&dir, ScriptLauncher::streaming(&dir));
    let app = gateway(&session, ScriptedEnumerator::two_screens());

    let (status, body) = send_json(&app, post("/api/start", Some(r#"{"id":1}"#))).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(session.snapshot().source_id.as_deref(), Some("1"));

    session.stop().await.unwrap();
}

#[tokio::test]
async fn test_null_id_uses_default_source() {
    let (_tmp, dir) = stream_dir();
    let session = session_with(&dir, ScriptLauncher::streaming(&dir));
    let app = gateway(&session, ScriptedEnumerator::two_screens());

    let (status, _) = send_json(&app, post("/api/start", Some(r#"{"id":null}"#))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session.snapshot().source_id.as_deref(), Some("3"));

    session.stop().await.unwrap();
}

#[tokio::test]
async fn test_wrong_id_type_is_rejected() {
    let (_tmp, dir) = stream_dir();
    let launcher = ScriptLauncher::streaming(&dir);
    let launches = launcher.launches();
    let session = session_with(&dir, launcher);
    let app = gateway(&session, ScriptedEnumerator::two_screens());

    let (status, body) = send_json(&app, post("/api/start", Some(r#"{"id":true}"#))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"], "invalid_request");
    assert_eq!(launches.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert!(!session.is_running());
}

#[tokio::test]
async fn test_second_start_conflicts() {
    let (_tmp, dir) = stream_dir();
    let session = session_with(&dir, ScriptLauncher::streaming(&dir));
    let app = gateway(&session, ScriptedEnumerator::two_screens());

    let (status, _) = send_json(&app, post("/api/start", Some(r#"{"id":"1"}"#))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send_json(&app, post("/api/start", Some(r#"{"id":"2"}"#))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"], "already_running");
    assert_eq!(session.snapshot().source_id.as_deref(), Some("1"));

    session.stop().await.unwrap();
}

#[tokio::test]
async fn test_concurrent_start_requests() {
    let (_tmp, dir) = stream_dir();
    let session = session_with(&dir, ScriptLauncher::streaming(&dir));
    let app = gateway(&session, ScriptedEnumerator::two_screens());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let app = app.clone();
            tokio::spawn(async move { send_json(&app, post("/api/start", Some(r#"{"id":"1"}"#))).await.0 })
        })
        .collect();

    let mut codes = Vec::new();
    for handle in handles {
        codes.push(handle.await.unwrap());
    }

    assert_eq!(codes.iter().filter(|c| **c == StatusCode::OK).count(), 1);
    assert_eq!(codes.iter().filter(|c| **c == StatusCode::CONFLICT).count(), 3);

    session.stop().await.unwrap();
}

#[tokio::test]
async fn test_launch_failure_is_reported() {
    let (_tmp, dir) = stream_dir();
    let session = session_with(&dir, ScriptLauncher::failing(&dir, "no permission"));
    let app = gateway(&session, ScriptedEnumerator::two_screens());

    let (status, body) = send_json(&app, post("/api/start", Some(r#"{"id":"1"}"#))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "process_launch_failed");
    assert!(body["message"].as_str().unwrap().contains("no permission"));
    assert!(body["hint"].is_string());

    let (_, body) = send_json(&app, get("/api/status")).await;
    assert_eq!(body["state"], "idle");
}

#[tokio::test]
async fn test_stream_names_cannot_escape() {
    let (tmp, dir) = stream_dir();
    std::fs::write(tmp.path().join("secret.txt"), b"secret").unwrap();

    let session = session_with(&dir, ScriptLauncher::streaming(&dir));
    let app = gateway(&session, ScriptedEnumerator::two_screens());
    session.start("1").await.unwrap();

    for uri in [
        "/hls/..%2Fsecret.txt",
        "/hls/%2E%2E%2Fsecret.txt",
        "/hls/../secret.txt",
        "/hls/.hidden",
        "/hls/missing.ts",
        "/hls/seg000.ts.tmp",
        "/hls/",
    ] {
        let (status, _, body) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_ne!(body, b"secret", "{}", uri);
    }

    session.stop().await.unwrap();
}

#[tokio::test]
async fn test_sources_listing() {
    let (_tmp, dir) = stream_dir();
    let session = session_with(&dir, ScriptLauncher::streaming(&dir));
    let app = gateway(&session, ScriptedEnumerator::two_screens());

    let (status, body) = send_json(&app, get("/api/sources")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["screens"][0]["id"], "1");
    assert_eq!(body["screens"][0]["label"], "Screen 0");
    assert_eq!(body["screens"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_sources_unavailable() {
    let (_tmp, dir) = stream_dir();
    let session = session_with(&dir, ScriptLauncher::streaming(&dir));
    let app = gateway(&session, ScriptedEnumerator::failing("ffmpeg not found"));

    let (status, body) = send_json(&app, get("/api/sources")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"], "enumeration_failed");
}

#[tokio::test]
async fn test_viewer_page_follows_state() {
    let (_tmp, dir) = stream_dir();
    let session = session_with(&dir, ScriptLauncher::streaming(&dir));
    let app = gateway(&session, ScriptedEnumerator::two_screens());

    let (status, headers, body) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/html"));
    assert!(String::from_utf8_lossy(&body).contains("not active yet"));

    session.start("1").await.unwrap();
    let (_, _, body) = send(&app, get("/index.html")).await;
    assert!(String::from_utf8_lossy(&body).contains("/hls/stream.m3u8"));

    let (status, _, body) = send(&app, get("/project")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8_lossy(&body).contains("/api/start"));

    session.stop().await.unwrap();
}

#[tokio::test]
async fn test_static_dir_overrides_pages() {
    let (tmp, dir) = stream_dir();
    let pages = tmp.path().join("pages");
    std::fs::create_dir_all(&pages).unwrap();
    std::fs::write(pages.join("control.html"), "<h1>Custom control</h1>").unwrap();

    let session = session_with(&dir, ScriptLauncher::streaming(&dir));
    let state = GatewayState::new(session, Arc::new(ScriptedEnumerator::two_screens()), PORT)
        .with_static_dir(&pages);
    let app = router(state);

    let (_, _, body) = send(&app, get("/project")).await;
    assert_eq!(body, b"<h1>Custom control</h1>");
}
