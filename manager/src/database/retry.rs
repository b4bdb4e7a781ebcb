//! Bounded retry for transient SQLite failures.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::StoreRetryConfig;

/// SQLITE_BUSY and SQLITE_LOCKED; extended codes share the low byte
const SQLITE_BUSY: i64 = 5;
const SQLITE_LOCKED: i64 = 6;

pub fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut => true,
        sqlx::Error::Database(db_err) => {
            let by_code = db_err
                .code()
                .and_then(|code| code.parse::<i64>().ok())
                .map(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
                .unwrap_or(false);
            by_code || db_err.message().contains("database is locked")
        }
        _ => false,
    }
}

fn random_wait(policy: &StoreRetryConfig) -> Duration {
    let (low, high) = if policy.wait_random_min_ms <= policy.wait_random_max_ms {
        (policy.wait_random_min_ms, policy.wait_random_max_ms)
    } else {
        (policy.wait_random_max_ms, policy.wait_random_min_ms)
    };
    Duration::from_millis(fastrand::u64(low..=high))
}

/// Run `op` until it succeeds, fails with a non-transient error, or
/// `stop_after_attempt` attempts have been made.
pub async fn retry_transient<T, F, Fut>(
    policy: &StoreRetryConfig,
    operation: &str,
    mut op: F,
) -> Result<T, sqlx::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    let max_attempts = policy.stop_after_attempt.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", operation, attempt);
                }
                return Ok(value);
            }
            Err(e) if is_transient(&e) && attempt < max_attempts => {
                let wait = random_wait(policy);
                warn!(
                    "{} failed with transient error (attempt {}/{}), retrying in {:?}: {}",
                    operation, attempt, max_attempts, wait, e
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
