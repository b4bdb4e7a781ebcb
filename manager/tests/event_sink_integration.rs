//! Integration tests for interruption event delivery
//!
//! These tests verify that maintenance start/end events reach the webhook
//! and in-process subscribers, and that a failing webhook never blocks a
//! maintenance transition.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::fixtures::*;
use maintenance_manager::maintenance_tracker::DeviceMaintenanceTracker;
use maintenance_manager::services::{
    BroadcastEventSink, EventSink, FanoutEventSink, InterruptionKind, WebhookEventSink,
};

fn webhook_sink(server: &MockWebhookServer) -> WebhookEventSink {
    WebhookEventSink::new(server.webhook_url(), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_webhook_receives_interruption_events() {
    let server = MockWebhookServer::start().await;
    server.mock_success().await;

    let tracker = DeviceMaintenanceTracker::new(
        Arc::new(sample_topology()),
        Arc::new(webhook_sink(&server)),
    );
    let window = WindowBuilder::new("mw").switches(&[switches::S3]).build();

    tracker.start_mw(&window).await.unwrap();
    tracker.end_mw(&window).await.unwrap();

    let bodies = server.received_bodies().await;
    assert_eq!(bodies.len(), 2);

    assert_eq!(bodies[0]["name"], "topology.interruption.start");
    assert_eq!(bodies[0]["kind"], "start");
    assert_eq!(bodies[0]["content"]["type"], "maintenance");
    assert_eq!(
        bodies[0]["content"]["switches"],
        serde_json::json!([switches::S3])
    );
    assert_eq!(
        bodies[0]["content"]["interfaces"],
        serde_json::json!([interfaces::S3_1])
    );
    assert_eq!(bodies[0]["content"]["links"], serde_json::json!([links::L2]));

    assert_eq!(bodies[1]["name"], "topology.interruption.end");
    assert_eq!(bodies[1]["content"]["links"], serde_json::json!([links::L2]));
}

#[tokio::test]
async fn test_webhook_failure_is_reported_by_sink() {
    let server = MockWebhookServer::start().await;
    server.mock_failure(500).await;

    let sink = webhook_sink(&server);
    let event = maintenance_manager::services::InterruptionEvent::maintenance(
        InterruptionKind::Start,
        Default::default(),
    );

    let err = sink.emit(event).await.unwrap_err();
    assert!(err.to_string().contains("500"));
    assert_eq!(server.request_count().await, 1);
    assert_eq!(sink.get_webhook_url(), server.webhook_url());
}

#[tokio::test]
async fn test_webhook_failure_does_not_block_maintenance() {
    let server = MockWebhookServer::start().await;
    server.mock_failure(503).await;

    let tracker = DeviceMaintenanceTracker::new(
        Arc::new(sample_topology()),
        Arc::new(webhook_sink(&server)),
    );
    let window = WindowBuilder::new("mw").switches(&[switches::S1]).build();

    tracker.start_mw(&window).await.unwrap();
    assert!(!tracker.switch_not_in_maintenance(switches::S1).await);
    tracker.end_mw(&window).await.unwrap();
    assert!(tracker.switch_not_in_maintenance(switches::S1).await);

    assert_eq!(server.request_count().await, 2);
}

#[tokio::test]
async fn test_fanout_delivers_to_every_sink() {
    let server = MockWebhookServer::start().await;
    server.mock_failure(500).await;

    let broadcast = BroadcastEventSink::new(16);
    let mut receiver = broadcast.subscribe();
    let recording = RecordingEventSink::new();

    let fanout = FanoutEventSink::new(vec![
        Arc::new(webhook_sink(&server)),
        Arc::new(broadcast.clone()),
        Arc::new(recording.clone()),
    ]);
    let tracker = DeviceMaintenanceTracker::new(Arc::new(sample_topology()), Arc::new(fanout));
    let window = WindowBuilder::new("mw").links(&[links::L1]).build();

    tracker.start_mw(&window).await.unwrap();

    // The failing webhook does not stop the other sinks
    let received = receiver.recv().await.unwrap();
    assert_eq!(received.kind, InterruptionKind::Start);
    assert_eq!(received.devices().links, ids(&[links::L1]));
    assert_eq!(recording.events().await.len(), 1);
    assert_eq!(server.request_count().await, 1);
}
