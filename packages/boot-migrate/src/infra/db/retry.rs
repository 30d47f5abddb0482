use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::MigrationError;
use crate::infra::db::diagnostics::migration_counters;

/// Bounded retry with a fixed pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    retries: u32,
    delay: Duration,
}

impl RetryPolicy {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    /// One attempt is always made, even with zero retries configured.
    pub fn max_attempts(&self) -> u32 {
        self.retries.max(1)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `attempt_fn` until it succeeds, fails with a non-retryable error,
    /// or the attempt budget is spent. The closure receives the 1-based attempt.
    pub async fn run_with_retry<T, F, Fut>(&self, mut attempt_fn: F) -> Result<T, MigrationError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, MigrationError>>,
    {
        let max_attempts = self.max_attempts();
        let delay_ms = self.delay.as_millis();
        let mut attempt = 1;

        loop {
            migration_counters::attempt();
            match attempt_fn(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(attempt, max_attempts, delay_ms, "migration_retry=success");
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if attempt >= max_attempts => {
                    warn!(attempt, max_attempts, error = %e, "migration_retry=exhausted");
                    return Err(MigrationError::MigrationRetriesExhausted {
                        attempts: attempt,
                        last_cause: Box::new(e),
                    });
                }
                Err(e) => {
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms,
                        error = %e,
                        "migration_retry=failed"
                    );
                    migration_counters::retry();
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
