//! Time-driven lifecycle of maintenance windows
//!
//! This module drives every window through `pending -> running -> finished`:
//! - **Task scheduling**: one-shot `{id}-start` / `{id}-end` jobs on
//!   tokio-cron-scheduler, see [`TaskScheduler`]
//! - **Orchestration**: overlap validation, persistence, device tracking and
//!   (re)arming of tasks, see [`MaintenanceScheduler`]
//! - **Boot catch-up**: windows whose start or end passed while the process
//!   was down are transitioned on [`MaintenanceScheduler::start`]
//!
//! # Concurrency
//!
//! All mutating operations, including fired tasks, run under one lock. Fired
//! tasks re-check the stored status before transitioning, so a task that
//! races a manual end or a removal backs off instead of failing.
//!
//! # Timer horizon
//!
//! Delays are capped at [`MAX_DELAY`](crate::constants::timer::MAX_DELAY).
//! A window ending at the far-future sentinel gets its end task re-armed each
//! time the capped delay elapses.

pub mod operations;
pub mod tasks;

pub use operations::MaintenanceScheduler;
pub use tasks::{TaskHandler, TaskKind, TaskScheduler};
