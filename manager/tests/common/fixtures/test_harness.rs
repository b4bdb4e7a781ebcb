//! Scheduler wired to an in-memory database and a recording event sink

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use maintenance_manager::database::Database;
use maintenance_manager::maintenance_tracker::DeviceMaintenanceTracker;
use maintenance_manager::scheduler::MaintenanceScheduler;
use maintenance_manager::services::{EventSink, InterruptionEvent, InterruptionKind};
use maintenance_manager::store::WindowStore;
use maintenance_manager::window::{MaintenanceWindow, Status};

use super::test_data::sample_topology;

/// Event sink that keeps every event in memory
#[derive(Clone, Default)]
pub struct RecordingEventSink {
    events: Arc<Mutex<Vec<InterruptionEvent>>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<InterruptionEvent> {
        self.events.lock().await.clone()
    }

    pub async fn events_of(&self, kind: InterruptionKind) -> Vec<InterruptionEvent> {
        self.events
            .lock()
            .await
            .iter()
            .filter(|event| event.kind == kind)
            .cloned()
            .collect()
    }

    pub async fn clear(&self) {
        self.events.lock().await.clear();
    }
}

#[async_trait]
impl EventSink for RecordingEventSink {
    async fn emit(&self, event: InterruptionEvent) -> Result<()> {
        self.events.lock().await.push(event);
        Ok(())
    }
}

pub struct TestHarness {
    pub store: Arc<Database>,
    pub events: RecordingEventSink,
    pub tracker: Arc<DeviceMaintenanceTracker>,
    pub scheduler: Arc<MaintenanceScheduler>,
}

impl TestHarness {
    /// Started scheduler over a fresh in-memory database
    pub async fn new() -> Self {
        let store = Arc::new(Database::in_memory().await.unwrap());
        Self::with_store(store).await
    }

    /// Started scheduler over an existing database, e.g. to simulate a restart
    pub async fn with_store(store: Arc<Database>) -> Self {
        let events = RecordingEventSink::new();
        let tracker = Arc::new(DeviceMaintenanceTracker::new(
            Arc::new(sample_topology()),
            Arc::new(events.clone()),
        ));
        let scheduler = MaintenanceScheduler::new(store.clone(), tracker.clone())
            .await
            .unwrap();
        scheduler.start().await.unwrap();

        Self {
            store,
            events,
            tracker,
            scheduler,
        }
    }

    pub async fn stored(&self, id: &str) -> Option<MaintenanceWindow> {
        self.store.get_window(id).await.unwrap()
    }

    /// Poll the store until `id` reaches `status`
    pub async fn wait_for_status(&self, id: &str, status: Status, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.stored(id).await.map(|w| w.status) == Some(status) {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}
