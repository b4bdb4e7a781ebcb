//! Persistence seam used by the scheduler
//!
//! The scheduler never talks to SQL directly. [`WindowStore`] covers CRUD by
//! id plus the guarded status transitions the task callbacks rely on: a
//! transition only applies while the window is still in the expected status,
//! so a callback that lost a race against a manual end sees `None` and backs
//! off.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::Result;
use crate::window::{MaintenanceWindow, Status};

/// Outcome of the boot-time catch-up scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatchUp {
    /// PENDING windows whose start already passed, now RUNNING
    pub started: u64,
    /// RUNNING windows whose end already passed, now FINISHED
    pub finished: u64,
}

#[async_trait]
pub trait WindowStore: Send + Sync {
    /// Insert a new window; fails with `DuplicateId` when the id exists.
    /// Returns the stored record with `inserted_at`/`updated_at` set.
    async fn insert_window(
        &self,
        window: &MaintenanceWindow,
        now: DateTime<Utc>,
    ) -> Result<MaintenanceWindow>;

    /// Replace every client-editable field. Status is left untouched.
    async fn update_window(
        &self,
        window: &MaintenanceWindow,
        now: DateTime<Utc>,
    ) -> Result<MaintenanceWindow>;

    async fn get_window(&self, id: &str) -> Result<Option<MaintenanceWindow>>;

    async fn get_windows(&self) -> Result<Vec<MaintenanceWindow>>;

    /// PENDING and RUNNING windows
    async fn get_unfinished_windows(&self) -> Result<Vec<MaintenanceWindow>>;

    /// Atomically move `id` from `from` to `to`. `None` when the window is
    /// missing or no longer in `from`.
    async fn transition_window(
        &self,
        id: &str,
        from: Status,
        to: Status,
        now: DateTime<Utc>,
    ) -> Result<Option<MaintenanceWindow>>;

    /// Returns false when nothing was deleted
    async fn remove_window(&self, id: &str) -> Result<bool>;

    /// Catch up on transitions missed while the process was down
    async fn prepare_start(&self, now: DateTime<Utc>) -> Result<CatchUp>;
}
