use std::{fmt, future::Future, time::Duration};

use tracing::warn;

/// Bounded exponential backoff without jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub increase_factor: u32,
    /// Retries after the first attempt; total attempts are `max_retries + 1`.
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(1000),
            increase_factor: 3,
            max_retries: 3,
        }
    }
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Sleep before retry number `retry` (1-based): `initial_delay * factor^retry`.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let factor = self.increase_factor.saturating_pow(retry);
        self.initial_delay.saturating_mul(factor)
    }
}

/// Run `operation` until it succeeds or the policy is exhausted.
///
/// The error of the final attempt is returned unchanged. A sleep that has
/// started always runs to completion.
pub async fn retry_every<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut retries = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if retries >= policy.max_retries => return Err(err),
            Err(err) => {
                retries += 1;
                let delay = policy.delay_for_retry(retries);
                warn!(
                    attempt = retries,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "retrying after failure: {err}"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
