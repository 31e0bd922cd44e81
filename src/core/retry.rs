//! Retry loop for transient schema conflicts.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::client::FivetranError;

/// How often and how patiently to retry a conflicting schema write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Base delay; attempt `n` waits `n * delay`.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Policy with the given attempt count and the default delay.
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Set the base delay between attempts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Run `operation` until it succeeds, fails with a non-conflict error, or
/// the policy's attempts are used up.
pub async fn retry_on_conflict<T, F, Fut>(
    policy: &RetryPolicy,
    what: &str,
    mut operation: F,
) -> Result<T, FivetranError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FivetranError>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_conflict() && attempt < policy.max_attempts => {
                warn!(
                    operation = %what,
                    attempt = attempt,
                    max_attempts = policy.max_attempts,
                    error = %e,
                    "Schema conflict, retrying"
                );
                tokio::time::sleep(policy.delay * attempt).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
