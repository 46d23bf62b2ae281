//! Exponential backoff retry shared by the chat backends.

use std::future::Future;
use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use tracing::{debug, warn};

/// Default number of total attempts.
pub const MAX_ATTEMPTS: u32 = 3;
const INITIAL_INTERVAL_SECS: u64 = 1;
const MAX_INTERVAL_SECS: u64 = 30;

/// How many times to try and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_interval: Duration,
    pub max_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            initial_interval: Duration::from_secs(INITIAL_INTERVAL_SECS),
            max_interval: Duration::from_secs(MAX_INTERVAL_SECS),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Single attempt, no waiting.
    pub fn once() -> Self {
        Self::with_max_attempts(1)
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_interval,
            max_interval: self.max_interval,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

/// Retry an async operation with exponential backoff.
///
/// `attempt` is called up to `policy.max_attempts` times. An error for which
/// `is_transient` returns false is returned immediately. When every attempt
/// failed transiently, `wrap_exhausted` receives the last error and the
/// number of attempts made.
pub async fn retry_with_backoff<T, E, Fut, F, P, W>(
    policy: &RetryPolicy,
    mut attempt: F,
    is_transient: P,
    wrap_exhausted: W,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    W: FnOnce(E, u32) -> E,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut backoff = policy.backoff();
    let mut attempts = 0;

    loop {
        attempts += 1;

        let error = match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !is_transient(&error) {
            debug!("Attempt {} failed permanently: {}", attempts, error);
            return Err(error);
        }

        if attempts >= max_attempts {
            return Err(wrap_exhausted(error, attempts));
        }

        warn!("Attempt {}/{} failed: {}", attempts, max_attempts, error);
        if let Some(wait_duration) = backoff.next_backoff() {
            debug!("Retrying in {:?}", wait_duration);
            tokio::time::sleep(wait_duration).await;
        }
    }
}
