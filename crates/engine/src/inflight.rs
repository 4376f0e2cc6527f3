// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry of Workers and Jobs whose first dispatch is still running
//!
//! A create call persists its Worker or Job and then schedules it. While it
//! is between those steps the record looks stranded, so the reconciler
//! consults this registry before issuing a replacement token or scheduling
//! a second copy.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Shared set of dispatch keys. Clones see the same set.
#[derive(Clone, Default)]
pub struct InFlight {
    keys: Arc<Mutex<HashSet<String>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn worker_key(event_id: &str) -> String {
        event_id.to_string()
    }

    pub fn job_key(event_id: &str, job_name: &str) -> String {
        format!("{}:{}", event_id, job_name)
    }

    /// Mark `key` as dispatching until the returned guard drops.
    pub fn begin(&self, key: String) -> Dispatching {
        self.keys.lock().insert(key.clone());
        Dispatching {
            keys: Arc::clone(&self.keys),
            key,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.lock().contains(key)
    }
}

/// Held for the duration of one dispatch
#[must_use = "the dispatch is only registered while the guard lives"]
pub struct Dispatching {
    keys: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Drop for Dispatching {
    fn drop(&mut self) {
        self.keys.lock().remove(&self.key);
    }
}

#[cfg(test)]
#[path = "inflight_tests.rs"]
mod tests;
