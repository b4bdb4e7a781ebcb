// File: manager/src/services/mod.rs

pub mod event_service;

pub use event_service::{
    AffectedDevices, BroadcastEventSink, EventSink, FanoutEventSink, InterruptionEvent,
    InterruptionKind, WebhookEventSink,
};
