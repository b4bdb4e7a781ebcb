// File: manager/src/scheduler/operations.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;
use tokio_cron_scheduler::JobScheduler;
use tracing::{debug, error, info, instrument, warn};

use super::tasks::{TaskHandler, TaskKind, TaskScheduler};
use crate::constants::timer;
use crate::errors::{MaintenanceError, Result};
use crate::maintenance_tracker::DeviceMaintenanceTracker;
use crate::store::WindowStore;
use crate::window::{check_overlap, lifecycle, MaintenanceWindow, Status, Transition, WindowUpdate};

pub struct MaintenanceScheduler {
    store: Arc<dyn WindowStore>,
    tracker: Arc<DeviceMaintenanceTracker>,
    tasks: TaskScheduler,
    // Serializes every state-mutating operation, task callbacks included
    op_lock: Mutex<()>,
}

fn is_early(due: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    (due - now)
        .to_std()
        .map(|ahead| ahead > timer::EARLY_FIRE_TOLERANCE)
        .unwrap_or(false)
}

impl MaintenanceScheduler {
    pub async fn new(
        store: Arc<dyn WindowStore>,
        tracker: Arc<DeviceMaintenanceTracker>,
    ) -> Result<Arc<Self>> {
        let job_scheduler = JobScheduler::new().await?;

        Ok(Arc::new_cyclic(|weak: &Weak<Self>| {
            let handler: Weak<dyn TaskHandler> = weak.clone();
            Self {
                store,
                tracker,
                tasks: TaskScheduler::new(job_scheduler, handler),
                op_lock: Mutex::new(()),
            }
        }))
    }

    pub fn tracker(&self) -> &Arc<DeviceMaintenanceTracker> {
        &self.tracker
    }

    pub fn tasks(&self) -> &TaskScheduler {
        &self.tasks
    }

    /// Catch up on missed transitions, rebuild device state for running
    /// windows and arm the timers of every unfinished window.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<()> {
        let _guard = self.op_lock.lock().await;
        info!("Starting maintenance scheduler");

        let catch_up = self.store.prepare_start(Utc::now()).await?;
        debug!(
            "Catch-up moved {} windows to running and {} to finished",
            catch_up.started, catch_up.finished
        );

        let windows = self.store.get_unfinished_windows().await?;
        let mut scheduled_count = 0;

        for window in &windows {
            if window.status == Status::Running && !self.tracker.is_window_active(&window.id).await {
                match self.tracker.start_mw(window).await {
                    Ok(_) => info!("✓ Restored device maintenance for running window {}", window.id),
                    Err(e) => error!("✗ Failed to restore device maintenance for {}: {}", window.id, e),
                }
            }

            match self.schedule(window).await {
                Ok(_) => scheduled_count += 1,
                Err(e) => error!("✗ Failed to schedule window {}: {}", window.id, e),
            }
        }

        self.tasks.start().await?;
        info!(
            "✓ Maintenance scheduler started with {} unfinished windows",
            scheduled_count
        );
        Ok(())
    }

    /// Cancel every task and release the devices of running windows. Stored
    /// windows keep their status.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<()> {
        let _guard = self.op_lock.lock().await;
        info!("Shutting down maintenance scheduler");

        let unscheduled = match self.store.get_unfinished_windows().await {
            Ok(windows) => {
                for window in &windows {
                    self.unschedule(window).await;
                }
                Ok(())
            }
            Err(e) => {
                error!("✗ Failed to load windows during shutdown: {}", e);
                Err(e)
            }
        };

        self.tasks.shutdown().await?;
        unscheduled?;
        info!("✓ Maintenance scheduler stopped");
        Ok(())
    }

    /// Validate, persist and schedule a new window.
    ///
    /// `force = false` rejects any time overlap with an unfinished window;
    /// `force = true` only rejects overlaps that also share a device.
    #[instrument(skip(self, window), fields(window_id = %window.id))]
    pub async fn add(&self, window: MaintenanceWindow, force: bool) -> Result<MaintenanceWindow> {
        if window.status != Status::Pending {
            return Err(MaintenanceError::Validation(format!(
                "New maintenance must be pending, got {}",
                window.status
            )));
        }
        window.validate()?;

        let _guard = self.op_lock.lock().await;

        let existing = self.store.get_unfinished_windows().await?;
        let conflicts = check_overlap(&window, &existing, force);
        if !conflicts.is_empty() {
            warn!(
                "Maintenance window {} rejected, {} conflicting windows",
                window.id,
                conflicts.len()
            );
            return Err(MaintenanceError::overlap(window, conflicts));
        }

        let stored = self.store.insert_window(&window, Utc::now()).await?;
        self.schedule(&stored).await?;

        info!("✓ Maintenance window {} added: {} to {}", stored.id, stored.start, stored.end);
        Ok(stored)
    }

    /// Apply a partial update to a window that is not running, then move its
    /// pending tasks to the new times.
    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: &str, patch: WindowUpdate) -> Result<MaintenanceWindow> {
        let _guard = self.op_lock.lock().await;

        let current = self.find(id).await?;
        lifecycle::ensure_editable(&current)?;

        let now = Utc::now();
        let replacement = patch.apply_to(&current, now)?;
        let updated = self.store.update_window(&replacement, now).await?;
        self.reschedule(&updated).await?;

        info!("✓ Maintenance window {} updated", id);
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn remove(&self, id: &str) -> Result<()> {
        let _guard = self.op_lock.lock().await;

        let current = self.find(id).await?;
        if current.status == Status::Running {
            return Err(MaintenanceError::invalid_transition(
                id,
                "Deleting a running maintenance is not allowed",
            ));
        }

        self.unschedule(&current).await;
        if !self.store.remove_window(id).await? {
            return Err(MaintenanceError::NotFound(id.to_string()));
        }

        info!("✓ Maintenance window {} removed", id);
        Ok(())
    }

    /// Finish a running window now instead of at its end time
    #[instrument(skip(self))]
    pub async fn end_maintenance_early(&self, id: &str) -> Result<MaintenanceWindow> {
        let _guard = self.op_lock.lock().await;

        let current = self.find(id).await?;
        let finished = self.persist(&current, Transition::EndEarly).await?;

        // `current` still reads RUNNING, so this releases the devices
        self.unschedule(&current).await;

        info!("✓ Maintenance window {} ended early", id);
        Ok(finished)
    }

    /// Move the end of a running window by `minutes` (may be negative)
    #[instrument(skip(self))]
    pub async fn extend(&self, id: &str, minutes: i64) -> Result<MaintenanceWindow> {
        let _guard = self.op_lock.lock().await;

        let current = self.find(id).await?;
        let extended = lifecycle::extend(&current, minutes)?;
        let updated = self.store.update_window(&extended, Utc::now()).await?;
        self.tasks.reschedule(id, TaskKind::End, updated.end).await?;

        info!("✓ Maintenance window {} extended by {} minutes, ends at {}", id, minutes, updated.end);
        Ok(updated)
    }

    pub async fn get(&self, id: &str) -> Result<MaintenanceWindow> {
        self.find(id).await
    }

    pub async fn list(&self) -> Result<Vec<MaintenanceWindow>> {
        self.store.get_windows().await
    }

    /// Start a pending window immediately, as if its start task had fired
    #[instrument(skip(self))]
    pub async fn start_maintenance(&self, id: &str) -> Result<MaintenanceWindow> {
        let _guard = self.op_lock.lock().await;
        let current = self.find(id).await?;
        self.start_locked(&current).await
    }

    /// Finish a running window immediately, as if its end task had fired
    #[instrument(skip(self))]
    pub async fn end_maintenance(&self, id: &str) -> Result<MaintenanceWindow> {
        let _guard = self.op_lock.lock().await;
        let current = self.find(id).await?;
        self.end_locked(&current).await
    }

    async fn find(&self, id: &str) -> Result<MaintenanceWindow> {
        self.store
            .get_window(id)
            .await?
            .ok_or_else(|| MaintenanceError::NotFound(id.to_string()))
    }

    /// Apply `transition` to `window` and store it, guarded on the status
    /// the window was read with
    async fn persist(
        &self,
        window: &MaintenanceWindow,
        transition: Transition,
    ) -> Result<MaintenanceWindow> {
        let now = Utc::now();
        let next = lifecycle::apply(window, transition, now)?;

        self.store
            .transition_window(&window.id, transition.requires(), next.status, now)
            .await?
            .ok_or_else(|| {
                MaintenanceError::invalid_transition(
                    &window.id,
                    format!("Maintenance is no longer {}", transition.requires()),
                )
            })
    }

    async fn start_locked(&self, window: &MaintenanceWindow) -> Result<MaintenanceWindow> {
        let running = self.persist(window, Transition::Start).await?;

        self.tasks.cancel(&running.id, TaskKind::Start).await;
        self.tracker.start_mw(&running).await?;
        self.tasks.schedule_at(&running.id, TaskKind::End, running.end).await?;

        info!("✓ Maintenance window {} is running until {}", running.id, running.end);
        Ok(running)
    }

    async fn end_locked(&self, window: &MaintenanceWindow) -> Result<MaintenanceWindow> {
        let finished = self.persist(window, Transition::End).await?;

        self.tasks.cancel(&finished.id, TaskKind::End).await;
        self.tracker.end_mw(window).await?;

        info!("✓ Maintenance window {} finished", finished.id);
        Ok(finished)
    }

    /// Arm the task matching the window's status
    async fn schedule(&self, window: &MaintenanceWindow) -> Result<()> {
        match window.status {
            Status::Pending => {
                self.tasks
                    .schedule_at(&window.id, TaskKind::Start, window.start)
                    .await
            }
            Status::Running => {
                self.tasks
                    .schedule_at(&window.id, TaskKind::End, window.end)
                    .await
            }
            Status::Finished => {
                debug!("Window {} already finished, nothing to schedule", window.id);
                Ok(())
            }
        }
    }

    /// Move whichever tasks exist to the window's current times
    async fn reschedule(&self, window: &MaintenanceWindow) -> Result<()> {
        self.tasks
            .reschedule(&window.id, TaskKind::Start, window.start)
            .await?;
        self.tasks
            .reschedule(&window.id, TaskKind::End, window.end)
            .await?;
        Ok(())
    }

    /// Cancel both tasks. A window whose stored status was RUNNING also has
    /// its devices released, since its end task will never fire.
    async fn unschedule(&self, window: &MaintenanceWindow) {
        self.tasks.cancel_all(&window.id).await;

        if window.status != Status::Running {
            return;
        }
        if !self.tracker.is_window_active(&window.id).await {
            warn!("Running window {} has no device maintenance to release", window.id);
            return;
        }
        if let Err(e) = self.tracker.end_mw(window).await {
            error!("✗ Failed to release devices of window {}: {}", window.id, e);
        }
    }

    /// Timer path: tolerate races and early fires instead of failing
    async fn fire(&self, id: &str, kind: TaskKind) -> Result<()> {
        let _guard = self.op_lock.lock().await;

        let Some(window) = self.store.get_window(id).await? else {
            info!("Window {} was removed before its {} task ran", id, kind);
            return Ok(());
        };

        let (expected, due) = match kind {
            TaskKind::Start => (Status::Pending, window.start),
            TaskKind::End => (Status::Running, window.end),
        };
        if window.status != expected {
            info!(
                "Window {} is {} when its {} task ran, skipping",
                id, window.status, kind
            );
            return Ok(());
        }

        if is_early(due, Utc::now()) {
            debug!("Task {}-{} fired before {}, re-arming", id, kind, due);
            return self.tasks.schedule_at(id, kind, due).await;
        }

        match kind {
            TaskKind::Start => self.start_locked(&window).await.map(|_| ()),
            TaskKind::End => self.end_locked(&window).await.map(|_| ()),
        }
    }
}

#[async_trait]
impl TaskHandler for MaintenanceScheduler {
    async fn on_start(&self, window_id: &str) {
        if let Err(e) = self.fire(window_id, TaskKind::Start).await {
            error!("✗ Failed to start maintenance {}: {}", window_id, e);
        }
    }

    async fn on_end(&self, window_id: &str) {
        if let Err(e) = self.fire(window_id, TaskKind::End).await {
            error!("✗ Failed to end maintenance {}: {}", window_id, e);
        }
    }
}
