//! Integration tests for the HTTP API

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use std::time::Duration;

use codex7::core::{create_router, create_router_with_limits, ApiLimits};
use codex7::types::VerifyConfig;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder().method("DELETE").uri(uri).body(Body::empty()).unwrap()
}

async fn new_session(app: &axum::Router) -> String {
    let (status, json) = send(app, post("/session/new", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    json["session_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_router();
    let (status, json) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["canon_version"], "1.0.0");
    assert_eq!(json["sessions_active"], 0);
}

#[tokio::test]
async fn test_verify_text() {
    let app = create_router();
    let (status, json) = send(&app, post("/verify", json!({"text": "a".repeat(1200)}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["detected_phase"], "CRYSTAL_WHITE");
    assert_eq!(json["verified"], true);
    assert!(json["thermodynamic_state"].is_object());
    let kinds: Vec<&str> = json["gray_events"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["type"].as_str())
        .collect();
    assert!(kinds.contains(&"degeneracy_detected"));
}

#[tokio::test]
async fn test_verify_without_kernel() {
    let app = create_router();
    let (status, json) = send(
        &app,
        post("/verify", json!({"text": "short note", "includeKernel": false})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(json.get("thermodynamic_state").is_none());
    assert!(json.get("dominant_operator").is_none());
    assert!(json["detected_phase"].is_string());
}

#[tokio::test]
async fn test_verify_rejects_empty_and_unknown_threshold() {
    let app = create_router();
    let (status, _) = send(&app, post("/verify", json!({"text": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(
        &app,
        post("/verify", json!({"text": "hello there", "threshold": "GRAY_LOOP"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("GRAY_LOOP"));
}

#[tokio::test]
async fn test_verify_batch() {
    let app = create_router();
    let (status, json) = send(
        &app,
        post(
            "/verify/batch",
            json!({"texts": ["z".repeat(900), "mixed words of a plain sentence"], "threshold": "BLACK_COLLAPSE"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 2);
    assert_eq!(json["verified"], 2);
    assert_eq!(json["entries"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_check_array_and_string() {
    let app = create_router();

    let (status, json) = send(&app, post("/check", json!({"sequence": [0, 1, 2, 3]}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["is_valid"], true);
    assert_eq!(json["sequence_length"], 4);

    let (status, json) = send(&app, post("/check", json!({"sequence": "⚫🟡"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["is_valid"], false);
    assert_eq!(json["gray_events"][0]["type"], "adjacency_violation");
    assert_eq!(json["gray_events"][0]["delta"], 2);
    assert_eq!(json["gray_events"][0]["severity"], "ERROR");

    let (status, _) = send(&app, post("/check", json!({"sequence": 42}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_session_not_found() {
    let app = create_router();
    let (status, _) = send(&app, get("/session/nonexistent")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, post("/session/nonexistent/verify", json!({"text": "x"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_full_session_flow() {
    let app = create_router();

    let (status, json) = send(&app, post("/session/new", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    let id = json["session_id"].as_str().unwrap().to_string();
    assert_eq!(json["threshold_phase"], "WHITE_LATTICE");

    let mut potentials = Vec::new();
    for text in ["first turn of the talk", "second turn of the talk", "third turn"] {
        let (status, json) = send(&app, post(&format!("/session/{}/verify", id), json!({"text": text}))).await;
        assert_eq!(status, StatusCode::OK);
        potentials.push(json["thermodynamic_state"]["accumulated_potential"].as_f64().unwrap());
    }
    assert!(potentials.windows(2).all(|w| w[1] > w[0]));

    let (status, json) = send(&app, get(&format!("/session/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["verifications"], 3);

    let (_, json) = send(&app, get("/health")).await;
    assert_eq!(json["sessions_active"], 1);
}

#[tokio::test]
async fn test_session_verify_without_kernel() {
    let app = create_router();
    let id = new_session(&app).await;

    let (status, json) = send(
        &app,
        post(&format!("/session/{}/verify", id), json!({"text": "a quiet turn", "includeKernel": false})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    for key in ["thermodynamic_state", "dominant_operator", "regime", "lawfulness"] {
        assert!(json.get(key).is_none(), "{} present", key);
    }
    assert!(json["detected_phase"].is_string());

    // The kernel still advanced
    let (_, json) = send(&app, get(&format!("/session/{}", id))).await;
    assert_eq!(json["verifications"], 1);
}

#[tokio::test]
async fn test_delete_session() {
    let app = create_router();
    let id = new_session(&app).await;

    let response = app.clone().oneshot(delete(&format!("/session/{}", id))).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let (status, _) = send(&app, get(&format!("/session/{}", id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, delete(&format!("/session/{}", id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, json) = send(&app, get("/health")).await;
    assert_eq!(json["sessions_active"], 0);
}

#[tokio::test]
async fn test_sessions_evicted_at_capacity() {
    let limits = ApiLimits { max_sessions: 2, ..ApiLimits::default() };
    let app = create_router_with_limits(VerifyConfig::default(), limits);

    let first = new_session(&app).await;
    let second = new_session(&app).await;
    // Touch the first so the second is least recently used
    let (status, _) = send(&app, get(&format!("/session/{}", first))).await;
    assert_eq!(status, StatusCode::OK);
    let third = new_session(&app).await;

    let (_, json) = send(&app, get("/health")).await;
    assert_eq!(json["sessions_active"], 2);
    let (status, _) = send(&app, get(&format!("/session/{}", second))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    for id in [&first, &third] {
        let (status, _) = send(&app, get(&format!("/session/{}", id))).await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_idle_sessions_expire() {
    let limits = ApiLimits { session_idle_ttl: Duration::ZERO, ..ApiLimits::default() };
    let app = create_router_with_limits(VerifyConfig::default(), limits);

    let stale = new_session(&app).await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    let fresh = new_session(&app).await;

    let (status, _) = send(&app, get(&format!("/session/{}", stale))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, get(&format!("/session/{}", fresh))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_request_size_limits() {
    let limits = ApiLimits { max_batch_texts: 2, max_body_bytes: 1024, ..ApiLimits::default() };
    let app = create_router_with_limits(VerifyConfig::default(), limits);

    let (status, _) = send(&app, post("/verify/batch", json!({"texts": ["a", "b", "c"]}))).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

    let (status, _) = send(&app, post("/verify", json!({"text": "x".repeat(4096)}))).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

    let (status, json) = send(&app, post("/verify/batch", json!({"texts": ["a", "b"]}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 2);
}
