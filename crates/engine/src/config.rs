// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine tunables

use std::time::Duration;

/// Settings shared by the services and background passes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Delay between status snapshots on a watch stream.
    pub watch_interval: Duration,
    pub cleanup: CleanupConfig,
    /// How long an unscheduled PENDING Worker or Job is left alone before
    /// the dispatch reconciler re-issues its schedule call.
    pub dispatch_grace: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            watch_interval: Duration::from_secs(2),
            cleanup: CleanupConfig::default(),
            dispatch_grace: Duration::from_secs(60),
        }
    }
}

/// Sizing and retry policy for the cleanup pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupConfig {
    /// Number of tasks draining the queue.
    pub workers: usize,
    /// Pending cleanups held before new ones go straight to dead letters.
    pub queue_depth: usize,
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_depth: 256,
            attempts: 5,
            backoff: Duration::from_secs(5),
        }
    }
}
