pub mod config;
pub mod constants;
pub mod database;
pub mod errors;
pub mod maintenance_tracker;
pub mod scheduler;
pub mod services;
pub mod store;
pub mod topology;
pub mod web;
pub mod window;

// Re-export commonly used types
pub use config::{Config, ConfigManager};
pub use database::Database;
pub use errors::{MaintenanceError, Result};
pub use maintenance_tracker::{DeviceKind, DeviceMaintenanceTracker, MaintenanceSnapshot};
pub use scheduler::MaintenanceScheduler;
pub use services::{BroadcastEventSink, EventSink, InterruptionEvent, WebhookEventSink};
pub use store::WindowStore;
pub use topology::{EntityStatus, StaticTopology, Topology};
pub use window::{MaintenanceWindow, NewWindow, Status, WindowUpdate};
