// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store implementation backed by [`StoreState`] behind a mutex

use crate::snapshot::{Snapshot, SnapshotError};
use crate::StoreState;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use convoy_core::{
    CleanupsStore, Event, EventsSelector, EventsStore, JobSpec, JobStatus, JobsStore, ListOptions,
    Page, Project, ProjectsStore, Result, WorkerSpec, WorkerStatus, WorkersStore,
};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Shared, cloneable store. Clones see the same records.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
    snapshot_path: Option<Arc<PathBuf>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the snapshot at `path` (if present) and checkpoint back to it.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SnapshotError> {
        let path = path.into();
        let state = Snapshot::load(&path)?
            .map(|snapshot| snapshot.state)
            .unwrap_or_default();
        tracing::info!(
            path = %path.display(),
            projects = state.projects.len(),
            events = state.events.len(),
            pending_cleanups = state.pending_cleanups.len(),
            "store opened",
        );
        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            snapshot_path: Some(Arc::new(path)),
        })
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref().map(|p| p.as_path())
    }

    /// Persist the current records. A no-op for purely in-memory stores.
    pub fn checkpoint(&self, now: DateTime<Utc>) -> Result<(), SnapshotError> {
        let Some(path) = self.snapshot_path.as_deref() else {
            return Ok(());
        };
        // Clone under the lock, write without it.
        let state = self.state.lock().clone();
        Snapshot::new(state, now).save(path)
    }

    /// Read-only access for inspection and tests.
    pub fn with_state<R>(&self, f: impl FnOnce(&StoreState) -> R) -> R {
        f(&self.state.lock())
    }
}

#[async_trait]
impl ProjectsStore for MemoryStore {
    async fn create_project(&self, project: &Project) -> Result<()> {
        self.state.lock().insert_project(project.clone())
    }

    async fn list_projects(&self, opts: &ListOptions) -> Result<Page<Project>> {
        Ok(self.state.lock().projects_page(opts))
    }

    async fn list_subscribers(&self, event: &Event) -> Result<Vec<Project>> {
        Ok(self.state.lock().subscribers(event))
    }

    async fn get_project(&self, id: &str) -> Result<Project> {
        self.state.lock().project(id).cloned()
    }

    async fn update_project(&self, project: &Project) -> Result<()> {
        self.state.lock().replace_project(project.clone())
    }

    async fn delete_project(&self, id: &str) -> Result<()> {
        self.state.lock().remove_project(id).map(|_| ())
    }
}

#[async_trait]
impl EventsStore for MemoryStore {
    async fn create_event(&self, event: &Event) -> Result<()> {
        self.state.lock().insert_event(event.clone())
    }

    async fn list_events(
        &self,
        selector: &EventsSelector,
        opts: &ListOptions,
    ) -> Result<Page<Event>> {
        Ok(self.state.lock().events_page(selector, opts))
    }

    async fn get_event(&self, id: &str) -> Result<Event> {
        self.state.lock().event(id).cloned()
    }

    async fn get_event_by_hashed_worker_token(&self, hashed_token: &str) -> Result<Event> {
        self.state.lock().event_by_hashed_token(hashed_token).cloned()
    }

    async fn cancel_event(&self, id: &str, at: DateTime<Utc>) -> Result<Event> {
        self.state.lock().cancel_event(id, at)
    }

    async fn cancel_events(
        &self,
        selector: &EventsSelector,
        at: DateTime<Utc>,
    ) -> Result<Vec<Event>> {
        Ok(self.state.lock().cancel_matching(selector, at))
    }

    async fn delete_event(&self, id: &str) -> Result<Event> {
        self.state.lock().remove_event(id)
    }

    async fn delete_events(&self, selector: &EventsSelector) -> Result<Vec<Event>> {
        Ok(self.state.lock().remove_matching(selector))
    }
}

#[async_trait]
impl WorkersStore for MemoryStore {
    async fn update_worker_spec(&self, event_id: &str, spec: &WorkerSpec) -> Result<()> {
        self.state.lock().set_worker_spec(event_id, spec)
    }

    async fn update_worker_status(&self, event_id: &str, status: &WorkerStatus) -> Result<()> {
        self.state.lock().set_worker_status(event_id, status)
    }

    async fn update_worker_hashed_token(&self, event_id: &str, hashed_token: &str) -> Result<()> {
        self.state
            .lock()
            .set_worker_hashed_token(event_id, hashed_token)
    }

    async fn mark_worker_scheduled(&self, event_id: &str) -> Result<()> {
        self.state.lock().set_worker_scheduled(event_id)
    }
}

#[async_trait]
impl JobsStore for MemoryStore {
    async fn create_job(
        &self,
        event_id: &str,
        name: &str,
        spec: &JobSpec,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.state.lock().insert_job(event_id, name, spec, at)
    }

    async fn update_job_status(
        &self,
        event_id: &str,
        name: &str,
        status: &JobStatus,
    ) -> Result<()> {
        self.state.lock().set_job_status(event_id, name, status)
    }

    async fn mark_job_scheduled(&self, event_id: &str, name: &str) -> Result<()> {
        self.state.lock().set_job_scheduled(event_id, name)
    }
}

#[async_trait]
impl CleanupsStore for MemoryStore {
    async fn pending_cleanups(&self) -> Result<Vec<Event>> {
        Ok(self.state.lock().cleanups())
    }

    async fn complete_cleanup(&self, event_id: &str) -> Result<()> {
        self.state.lock().settle_cleanup(event_id);
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
