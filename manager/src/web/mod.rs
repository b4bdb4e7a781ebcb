// File: manager/src/web/mod.rs
pub mod handlers;
pub mod server;

pub use server::{create_router, start_web_server};

use std::sync::Arc;

use crate::config::Config;
use crate::maintenance_tracker::DeviceMaintenanceTracker;
use crate::scheduler::MaintenanceScheduler;

// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub scheduler: Arc<MaintenanceScheduler>,
}

impl AppState {
    pub fn new(config: Arc<Config>, scheduler: Arc<MaintenanceScheduler>) -> Self {
        Self { config, scheduler }
    }

    pub fn tracker(&self) -> &Arc<DeviceMaintenanceTracker> {
        self.scheduler.tracker()
    }
}
