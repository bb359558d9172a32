//! Bounded retry with increasing backoff
//!
//! Transient GitLab failures (rate limits, 5xx, network hiccups) are retried
//! a fixed number of times before being surfaced. The policy is a plain value
//! so callers and tests can tune attempts and delay independently.

use std::thread;
use std::time::Duration;

/// Retry policy: total attempt count and the base delay between attempts.
///
/// The delay grows linearly: `base_delay * attempt` after the first failure,
/// `base_delay * 2` after the second, and so on.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// A policy that never sleeps, for tests.
    #[cfg(test)]
    pub fn immediate(attempts: u32) -> Self {
        Self {
            attempts,
            base_delay: Duration::ZERO,
        }
    }
}

/// Run `op` until it succeeds, the error is not retryable, or the policy's
/// attempts are exhausted. The last error is returned as-is.
pub fn retry<T, E>(
    policy: &RetryPolicy,
    is_retryable: impl Fn(&E) -> bool,
    mut op: impl FnMut() -> Result<T, E>,
) -> Result<T, E> {
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.attempts && is_retryable(&err) => {
                thread::sleep(policy.base_delay * attempt);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
