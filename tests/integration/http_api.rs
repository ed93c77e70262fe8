//! HTTP API integration tests.
//!
//! These tests send requests through the axum router with
//! `tower::ServiceExt::oneshot`, without binding a socket.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use aoc_race::race::Part;
use aoc_race::server::{router, AppState};

use crate::fixtures::{FakeSource, Harness, SESSION};

fn app(h: &Harness) -> Router {
    router(AppState::new(h.service.clone()))
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn start_body(fast_mode: bool) -> Value {
    json!({"year": 2023, "day": 1, "aoc_session": SESSION, "fast_mode": fast_mode})
}

/// Test: Config endpoint reports the default session
#[tokio::test]
async fn test_config_endpoint() {
    let h = Harness::new(FakeSource::new(1));
    let (status, body) = call(&app(&h), "GET", "/api/config", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["has_session"], false);
    assert!(body["current_year"].as_i64().unwrap() >= 2015);

    let h = Harness::with_default_session(FakeSource::new(1), Some("env-token"));
    let (_, body) = call(&app(&h), "GET", "/api/config", None).await;
    assert_eq!(body["has_session"], true);
}

/// Test: Full request cycle
/// Given an idle service
/// When a race is started, answered, polled and reset over HTTP
/// Then every endpoint answers with the documented shapes
#[tokio::test]
async fn test_race_request_cycle() {
    let h = Harness::new(FakeSource::new(1));
    let app = app(&h);

    let (status, body) = call(&app, "GET", "/api/race/status", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "NO_ACTIVE_RACE");

    let (status, body) = call(&app, "POST", "/api/race/start", Some(start_body(true))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["puzzle_title"], "Day 1: Trebuchet?!");
    assert_eq!(body["strategy"], "one-shot");
    assert_eq!(body["input_url"], "https://puzzles.test/2023/day/1/input");
    assert!(body["puzzle_part1"].as_str().unwrap().contains("Calibrate"));

    let (status, body) = call(&app, "POST", "/api/race/start", Some(start_body(false))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "A race is already in progress. Reset first.");

    let (status, body) = call(
        &app,
        "POST",
        "/api/race/submit",
        Some(json!({"part": 1, "answer": "99"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["correct"], false);
    assert_eq!(body["hint"], "too low");

    let (_, body) = call(
        &app,
        "POST",
        "/api/race/submit",
        Some(json!({"part": 1, "answer": "142"})),
    )
    .await;
    assert_eq!(body["correct"], true);
    assert_eq!(body["message"], "Correct!");
    assert!(body.get("hint").is_none());

    let (status, body) = call(
        &app,
        "POST",
        "/api/race/submit",
        Some(json!({"part": 1, "answer": "142"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "You already completed part 1");

    let (status, body) = call(&app, "GET", "/api/race/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "racing");
    assert_eq!(body["strategy"], "one-shot");
    assert!(body["elapsed_seconds"].is_f64());
    assert_eq!(body["part1"]["human"]["status"], "completed");
    assert!(body["part1"]["human"]["finish_time"].is_number());
    assert_eq!(body["part1"]["agent"]["status"], "running");
    assert!(body["part1"]["winner"].is_null());
    assert!(body["puzzle_part2"].is_string());

    let (status, body) = call(&app, "POST", "/api/race/reset", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    let (status, _) = call(&app, "GET", "/api/race/status", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(h.pipeline.launched_parts().iter().all(|p| *p == Part::One));
}

/// Test: Request validation errors
#[tokio::test]
async fn test_bad_requests() {
    let h = Harness::new(FakeSource::new(1));
    let app = app(&h);

    let (status, body) = call(
        &app,
        "POST",
        "/api/race/start",
        Some(json!({"year": 2023, "day": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MISSING_SESSION");

    let (status, body) = call(
        &app,
        "POST",
        "/api/race/start",
        Some(json!({"year": 2023, "day": 31, "aoc_session": SESSION})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    call(&app, "POST", "/api/race/start", Some(start_body(false))).await;
    let (status, body) = call(
        &app,
        "POST",
        "/api/race/submit",
        Some(json!({"part": 3, "answer": "1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_PART");

    let (status, body) = call(
        &app,
        "POST",
        "/api/race/submit",
        Some(json!({"part": 2, "answer": "1"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "PART_NOT_UNLOCKED");
}

/// Test: Malformed request bodies
/// Given a running race
/// When bodies are mistyped or not JSON at all
/// Then the error still uses the JSON error shape
#[tokio::test]
async fn test_malformed_bodies_use_json_errors() {
    let h = Harness::new(FakeSource::new(1));
    let app = app(&h);
    call(&app, "POST", "/api/race/start", Some(start_body(false))).await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/race/submit",
        Some(json!({"part": "1", "answer": "1"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "INVALID_REQUEST");
    assert!(body["error"].as_str().unwrap().contains("part"));

    let request = Request::builder()
        .method("POST")
        .uri("/api/race/start")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "INVALID_REQUEST");

    let (status, body) = call(&app, "GET", "/api/race/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["part1"]["human"]["status"], "pending");
}

/// Test: Health check
#[tokio::test]
async fn test_health_endpoint() {
    let h = Harness::new(FakeSource::new(1));
    let (status, body) = call(&app(&h), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());
}
