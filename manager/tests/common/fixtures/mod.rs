//! This module provides reusable test utilities:
//! - Mock webhook server for interruption events
//! - Sample topology and window builders
//! - A scheduler harness over an in-memory database

// Allow unused code in test fixtures - each test binary uses a subset
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod mock_webhook;
pub mod test_data;
pub mod test_harness;

// Re-export commonly used items
pub use mock_webhook::MockWebhookServer;
pub use test_data::*;
pub use test_harness::{RecordingEventSink, TestHarness};
