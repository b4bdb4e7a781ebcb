//! Application-wide constants for time formats, retry policy and timer limits

use std::time::Duration;

/// Wire format for window timestamps, e.g. `2026-10-17T12:00:00+0000`
pub const TIME_FMT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Reason reported by the status functions for devices under maintenance
pub const MAINTENANCE_REASON: &str = "maintenance";

/// Store retry defaults (overridable from config and environment)
pub mod store_retry {
    /// Attempts before a transient storage error is surfaced
    pub const STOP_AFTER_ATTEMPT: u32 = 3;

    /// Lower bound of the random wait between attempts
    pub const WAIT_RANDOM_MIN_MS: u64 = 100;

    /// Upper bound of the random wait between attempts
    pub const WAIT_RANDOM_MAX_MS: u64 = 1000;

    pub const ENV_STOP_AFTER_ATTEMPT: &str = "MAINTENANCE_STORE_RETRY_STOP_AFTER_ATTEMPT";
    pub const ENV_WAIT_RANDOM_MIN_MS: &str = "MAINTENANCE_STORE_RETRY_WAIT_RANDOM_MIN_MS";
    pub const ENV_WAIT_RANDOM_MAX_MS: &str = "MAINTENANCE_STORE_RETRY_WAIT_RANDOM_MAX_MS";
}

/// Timer constants
pub mod timer {
    use super::Duration;

    /// Longest delay handed to the job scheduler in one go. Tasks further out
    /// (the far-future end sentinel) are re-armed when they fire early.
    pub const MAX_DELAY: Duration = Duration::from_secs(365 * 24 * 3600);

    /// A task firing this much ahead of its due time is re-armed instead of run
    pub const EARLY_FIRE_TOLERANCE: Duration = Duration::from_secs(1);
}

/// Default configuration values
pub mod defaults {
    pub const HOST: &str = "0.0.0.0";
    pub const PORT: u16 = 8181;
    pub const DATABASE_PATH: &str = "data/maintenance.db";
    pub const EVENT_CHANNEL_CAPACITY: usize = 256;
    pub const WEBHOOK_TIMEOUT_SECONDS: u64 = 10;
}
