use log::{debug, warn};
use std::thread;
use std::time::Duration;

use super::error::ApiError;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(500);

/// Bounded retry budget for transient transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
        }
    }

    /// A single attempt, never retried.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_INITIAL_DELAY)
    }
}

/// Executes an operation, retrying only transient (transport-level) failures
/// with exponential backoff. Any other error is returned immediately.
pub fn retry_transient<T, F>(label: &str, policy: RetryPolicy, mut operation: F) -> Result<T, ApiError>
where
    F: FnMut() -> Result<T, ApiError>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut delay = policy.initial_delay;
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation() {
            Ok(result) => return Ok(result),
            Err(err) if err.is_transient() && attempt < max_attempts => {
                debug!(
                    "[http-retry] {} failed (attempt {}/{}), retrying in {}ms: {}",
                    label,
                    attempt,
                    max_attempts,
                    delay.as_millis(),
                    err
                );
                thread::sleep(delay);
                delay = delay.saturating_mul(2);
            }
            Err(err) => {
                if err.is_transient() && max_attempts > 1 {
                    warn!(
                        "[http-retry] {} giving up after {} attempt(s): {}",
                        label, attempt, err
                    );
                }
                return Err(err);
            }
        }
    }
}
