// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the adapters crate.

use std::time::Duration;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

fn parse_count(var: &str) -> Option<u32> {
    std::env::var(var).ok().and_then(|s| s.parse::<u32>().ok())
}

/// Per-invocation kubectl timeout (default: 30000ms).
pub fn kubectl_timeout() -> Duration {
    parse_duration_ms("CONVOY_KUBECTL_TIMEOUT_MS").unwrap_or(crate::subprocess::KUBECTL_TIMEOUT)
}

/// Broker connect/reconnect attempts before giving up (default: 10).
pub fn queue_connect_attempts() -> u32 {
    parse_count("CONVOY_QUEUE_CONNECT_ATTEMPTS")
        .filter(|n| *n > 0)
        .unwrap_or(10)
}

/// Pause between broker connect attempts (default: 10000ms).
pub fn queue_connect_backoff() -> Duration {
    parse_duration_ms("CONVOY_QUEUE_CONNECT_BACKOFF_MS").unwrap_or(Duration::from_secs(10))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
