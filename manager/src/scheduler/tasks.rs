// File: manager/src/scheduler/tasks.rs
//
// One-shot start/end tasks on top of tokio-cron-scheduler. Every task is
// registered under `{window_id}-start` or `{window_id}-end`; a fired job only
// runs its handler if it is still the registered job for its key, which makes
// reschedule and cancel race-free with respect to jobs already in flight.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::constants::timer;
use crate::errors::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Start,
    End,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Start => "start",
            TaskKind::End => "end",
        }
    }

    pub fn key(&self, window_id: &str) -> String {
        format!("{}-{}", window_id, self.as_str())
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiver of fired tasks
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn on_start(&self, window_id: &str);
    async fn on_end(&self, window_id: &str);
}

#[derive(Debug, Clone)]
struct ScheduledTask {
    job_id: Uuid,
    run_at: DateTime<Utc>,
}

type Registry = Arc<Mutex<HashMap<String, ScheduledTask>>>;

pub struct TaskScheduler {
    scheduler: JobScheduler,
    tasks: Registry,
    handler: Weak<dyn TaskHandler>,
}

fn delay_until(run_at: DateTime<Utc>) -> Duration {
    (run_at - Utc::now())
        .to_std()
        .unwrap_or(Duration::ZERO)
        .min(timer::MAX_DELAY)
}

impl TaskScheduler {
    pub fn new(scheduler: JobScheduler, handler: Weak<dyn TaskHandler>) -> Self {
        Self {
            scheduler,
            tasks: Arc::new(Mutex::new(HashMap::new())),
            handler,
        }
    }

    pub async fn start(&self) -> Result<()> {
        self.scheduler.start().await?;
        info!("✓ Task scheduler started");
        Ok(())
    }

    /// Drop every registered task and stop the underlying job scheduler
    pub async fn shutdown(&self) -> Result<()> {
        let drained: Vec<(String, ScheduledTask)> = self.tasks.lock().await.drain().collect();
        for (key, task) in drained {
            if let Err(e) = self.scheduler.remove(&task.job_id).await {
                debug!("Job for {} already gone during shutdown: {}", key, e);
            }
        }

        let mut scheduler = self.scheduler.clone();
        scheduler.shutdown().await?;
        info!("✓ Task scheduler stopped");
        Ok(())
    }

    /// Register a task for `window_id`, replacing any task of the same kind
    pub async fn schedule_at(
        &self,
        window_id: &str,
        kind: TaskKind,
        run_at: DateTime<Utc>,
    ) -> Result<()> {
        let key = kind.key(window_id);
        let delay = delay_until(run_at);

        let tasks = self.tasks.clone();
        let handler = self.handler.clone();
        let owned_id = window_id.to_string();

        let job = Job::new_one_shot_async(delay, move |job_id, _scheduler| {
            let tasks = tasks.clone();
            let handler = handler.clone();
            let window_id = owned_id.clone();

            Box::pin(async move {
                let key = kind.key(&window_id);
                {
                    let mut tasks = tasks.lock().await;
                    match tasks.get(&key) {
                        Some(task) if task.job_id == job_id => {
                            tasks.remove(&key);
                        }
                        _ => {
                            debug!("Task {} was superseded or cancelled, skipping", key);
                            return;
                        }
                    }
                }

                info!("⏰ Task {} fired", key);
                match handler.upgrade() {
                    Some(handler) => match kind {
                        TaskKind::Start => handler.on_start(&window_id).await,
                        TaskKind::End => handler.on_end(&window_id).await,
                    },
                    None => warn!("Task {} fired after its handler was dropped", key),
                }
            })
        })?;

        let job_id = job.guid();

        // Registered before the job is added so an immediate fire finds it
        let previous = self
            .tasks
            .lock()
            .await
            .insert(key.clone(), ScheduledTask { job_id, run_at });

        if let Some(previous) = previous {
            if let Err(e) = self.scheduler.remove(&previous.job_id).await {
                debug!("Previous job for {} already gone: {}", key, e);
            }
        }

        if let Err(e) = self.scheduler.add(job).await {
            let mut tasks = self.tasks.lock().await;
            if tasks.get(&key).is_some_and(|task| task.job_id == job_id) {
                tasks.remove(&key);
            }
            error!("✗ Failed to add task {}: {}", key, e);
            return Err(e.into());
        }

        if delay == timer::MAX_DELAY {
            debug!("Task {} due at {} clamped to {:?}", key, run_at, delay);
        }
        debug!("Scheduled task {} at {}", key, run_at);
        Ok(())
    }

    /// Move an existing task to `run_at`. Returns false (and logs) when no
    /// such task is registered.
    pub async fn reschedule(
        &self,
        window_id: &str,
        kind: TaskKind,
        run_at: DateTime<Utc>,
    ) -> Result<bool> {
        if !self.is_scheduled(window_id, kind).await {
            info!(
                "Task {} not found for reschedule, it already ran or was never scheduled",
                kind.key(window_id)
            );
            return Ok(false);
        }
        self.schedule_at(window_id, kind, run_at).await?;
        Ok(true)
    }

    /// Remove a task. Returns false (and logs) when no such task is registered.
    pub async fn cancel(&self, window_id: &str, kind: TaskKind) -> bool {
        let key = kind.key(window_id);
        let removed = self.tasks.lock().await.remove(&key);

        match removed {
            Some(task) => {
                if let Err(e) = self.scheduler.remove(&task.job_id).await {
                    debug!("Job for {} already gone: {}", key, e);
                }
                debug!("Cancelled task {}", key);
                true
            }
            None => {
                info!("Task {} not found, nothing to cancel", key);
                false
            }
        }
    }

    pub async fn cancel_all(&self, window_id: &str) {
        self.cancel(window_id, TaskKind::Start).await;
        self.cancel(window_id, TaskKind::End).await;
    }

    pub async fn is_scheduled(&self, window_id: &str, kind: TaskKind) -> bool {
        self.tasks.lock().await.contains_key(&kind.key(window_id))
    }

    pub async fn scheduled_at(&self, window_id: &str, kind: TaskKind) -> Option<DateTime<Utc>> {
        self.tasks
            .lock()
            .await
            .get(&kind.key(window_id))
            .map(|task| task.run_at)
    }

    pub async fn task_count(&self) -> usize {
        self.tasks.lock().await.len()
    }
}
