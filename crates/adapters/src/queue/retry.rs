// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed-attempt, fixed-interval retry

use super::QueueError;
use std::future::Future;
use std::time::Duration;

/// Bounded retry with a constant pause between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first (at least 1)
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            interval: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            interval,
        }
    }

    /// Policy from `CONVOY_QUEUE_CONNECT_ATTEMPTS` / `CONVOY_QUEUE_CONNECT_BACKOFF_MS`.
    pub fn from_env() -> Self {
        Self::new(
            crate::env::queue_connect_attempts(),
            crate::env::queue_connect_backoff(),
        )
    }

    /// Run `op` until it succeeds or attempts run out.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, QueueError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, QueueError>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= attempts => {
                    return Err(QueueError::Exhausted {
                        operation: operation.to_string(),
                        attempts,
                        last: e.to_string(),
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        operation,
                        attempt,
                        attempts,
                        error = %e,
                        "queue operation failed, retrying"
                    );
                    tokio::time::sleep(self.interval).await;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
