// Integration tests for web API handlers
mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use common::fixtures::*;
use maintenance_manager::config::Config;
use maintenance_manager::web::{create_router, AppState};
use maintenance_manager::window::{time_format, Status};

const BASE: &str = "/api/maintenance/v1";

fn router(harness: &TestHarness) -> Router {
    create_router(AppState::new(
        Arc::new(Config::default()),
        harness.scheduler.clone(),
    ))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
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
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn payload(start_in: Duration, length: Duration, switch: &str) -> Value {
    let start = Utc::now() + start_in;
    json!({
        "description": "planned work",
        "start": time_format::format(&start),
        "end": time_format::format(&(start + length)),
        "switches": [switch],
    })
}

#[tokio::test]
async fn test_create_get_and_list() {
    let harness = TestHarness::new().await;
    let app = router(&harness);

    let (status, body) = send(
        &app,
        "POST",
        BASE,
        Some(payload(Duration::hours(1), Duration::hours(1), switches::S1)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    let id = body["data"]["mw_id"].as_str().unwrap().to_string();
    assert_eq!(id.len(), 32);

    let (status, body) = send(&app, "GET", &format!("{}/{}", BASE, id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], id.as_str());
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["description"], "planned work");
    assert_eq!(body["data"]["switches"], json!([switches::S1]));

    let (status, body) = send(&app, "GET", BASE, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_with_client_id_and_duplicate() {
    let harness = TestHarness::new().await;
    let app = router(&harness);

    let mut first = payload(Duration::hours(1), Duration::hours(1), switches::S1);
    first["id"] = json!("1234");
    let (status, body) = send(&app, "POST", BASE, Some(first)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["mw_id"], "1234");

    let mut second = payload(Duration::hours(10), Duration::hours(1), switches::S2);
    second["id"] = json!("1234");
    let (status, body) = send(&app, "POST", BASE, Some(second)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Window with id: 1234 already exists");
}

#[tokio::test]
async fn test_create_validation_errors() {
    let harness = TestHarness::new().await;
    let app = router(&harness);
    let now = Utc::now();

    let past = json!({
        "start": time_format::format(&(now - Duration::hours(1))),
        "switches": [switches::S1],
    });
    let (status, body) = send(&app, "POST", BASE, Some(past)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Start in the past not allowed");

    let inverted = json!({
        "start": time_format::format(&(now + Duration::hours(2))),
        "end": time_format::format(&(now + Duration::hours(1))),
        "switches": [switches::S1],
    });
    let (status, body) = send(&app, "POST", BASE, Some(inverted)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "End before start not allowed");

    let empty = json!({ "start": time_format::format(&(now + Duration::hours(1))) });
    let (status, body) = send(&app, "POST", BASE, Some(empty)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "At least one item must be provided");

    let mut with_status = payload(Duration::hours(1), Duration::hours(1), switches::S1);
    with_status["status"] = json!("running");
    let (status, _) = send(&app, "POST", BASE, Some(with_status)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "POST", BASE, Some(json!({ "start": "tomorrow" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "GET", BASE, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_overlap_and_force() {
    let harness = TestHarness::new().await;
    let app = router(&harness);

    let mut first = payload(Duration::hours(1), Duration::hours(2), switches::S1);
    first["id"] = json!("W2");
    assert_eq!(send(&app, "POST", BASE, Some(first)).await.0, StatusCode::CREATED);

    let overlapping = payload(Duration::hours(2), Duration::hours(2), switches::S3);
    let (status, body) = send(&app, "POST", BASE, Some(overlapping.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("'W2'"));

    let mut forced = overlapping;
    forced["force"] = json!(true);
    let (status, _) = send(&app, "POST", BASE, Some(forced)).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_unknown_window_is_404() {
    let harness = TestHarness::new().await;
    let app = router(&harness);
    let uri = format!("{}/missing", BASE);

    let (status, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Maintenance with id missing not found");

    assert_eq!(send(&app, "DELETE", &uri, None).await.0, StatusCode::NOT_FOUND);
    assert_eq!(
        send(&app, "PATCH", &uri, Some(json!({ "description": "x" }))).await.0,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        send(&app, "PATCH", &format!("{}/end", uri), None).await.0,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        send(&app, "PATCH", &format!("{}/extend", uri), Some(json!({ "minutes": 5 }))).await.0,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_update_and_remove_pending_window() {
    let harness = TestHarness::new().await;
    let app = router(&harness);
    let window = WindowBuilder::new("mw").switches(&[switches::S1]).build();
    harness.scheduler.add(window, false).await.unwrap();
    let uri = format!("{}/mw", BASE);

    let (status, body) = send(
        &app,
        "PATCH",
        &uri,
        Some(json!({ "description": "moved", "links": [links::L2] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["description"], "moved");
    assert_eq!(body["data"]["links"], json!([links::L2]));

    let (status, _) = send(&app, "PATCH", &uri, Some(json!({ "status": "finished" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["response"],
        "Maintenance with id mw successfully removed"
    );
    assert!(harness.stored("mw").await.is_none());
}

#[tokio::test]
async fn test_end_and_extend_running_window() {
    let harness = TestHarness::new().await;
    let app = router(&harness);
    let window = WindowBuilder::new("mw").switches(&[switches::S1]).build();
    harness.scheduler.add(window, false).await.unwrap();
    let uri = format!("{}/mw", BASE);

    // Not running yet
    let (status, _) = send(&app, "PATCH", &format!("{}/end", uri), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let running = harness.scheduler.start_maintenance("mw").await.unwrap();

    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("{}/extend", uri),
        Some(json!({ "minutes": 45 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["end"],
        time_format::format(&(running.end + Duration::minutes(45)))
    );

    let (status, body) = send(&app, "PATCH", &format!("{}/end", uri), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "finished");
    assert_eq!(harness.stored("mw").await.unwrap().status, Status::Finished);
}

#[tokio::test]
async fn test_extend_requires_integer_minutes() {
    let harness = TestHarness::new().await;
    let app = router(&harness);
    let window = WindowBuilder::new("mw").switches(&[switches::S1]).build();
    harness.scheduler.add(window, false).await.unwrap();
    harness.scheduler.start_maintenance("mw").await.unwrap();
    let uri = format!("{}/mw/extend", BASE);

    let (status, body) = send(&app, "PATCH", &uri, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Minutes of extension must be sent");

    let (status, body) = send(&app, "PATCH", &uri, Some(json!({ "minutes": "ten" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Minutes of extension must be integer");

    let (status, _) = send(&app, "PATCH", &uri, Some(json!({ "minutes": 1.5 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_device_status_endpoints() {
    let harness = TestHarness::new().await;
    let app = router(&harness);
    let window = WindowBuilder::new("mw").switches(&[switches::S1]).build();
    harness.scheduler.add(window, false).await.unwrap();
    harness.scheduler.start_maintenance("mw").await.unwrap();

    let (status, body) = send(
        &app,
        "GET",
        &format!("{}/status/interface/{}", BASE, interfaces::S1_2),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["kind"], "interface");
    assert_eq!(body["data"]["status"], "DOWN");
    assert_eq!(body["data"]["status_reason"], json!(["maintenance"]));

    let (status, body) = send(
        &app,
        "GET",
        &format!("{}/status/links/{}", BASE, links::L2),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "UP");
    assert_eq!(body["data"]["status_reason"], json!([]));

    let (status, _) = send(&app, "GET", &format!("{}/status/router/r1", BASE), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "GET", &format!("{}/status", BASE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["switches"][switches::S1], 1);
    assert_eq!(body["data"]["active_windows"], json!(["mw"]));
}
