// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistence contracts, one trait per resource
//!
//! Stores report missing records as [`Error::NotFound`](crate::Error) and
//! rejected conditional updates as [`Error::Conflict`](crate::Error). Phase
//! checks happen in the same step as the write they guard.

use crate::error::Result;
use crate::event::{Event, EventsSelector};
use crate::job::{JobSpec, JobStatus};
use crate::project::Project;
use crate::worker::{WorkerSpec, WorkerStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Page size used when a caller asks for zero
pub const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Zero means [`DEFAULT_PAGE_SIZE`].
    pub limit: usize,
    /// Resume after the item with this id.
    pub continue_after: Option<String>,
}

impl ListOptions {
    pub fn effective_limit(&self) -> usize {
        if self.limit == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            self.limit
        }
    }
}

/// One page of a listing
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Pass back as `continue_after` to get the next page.
    pub continue_after: Option<String>,
    pub remaining: usize,
}

#[async_trait]
pub trait ProjectsStore: Clone + Send + Sync + 'static {
    /// Conflict if the id is taken.
    async fn create_project(&self, project: &Project) -> Result<()>;

    /// Ordered by id.
    async fn list_projects(&self, opts: &ListOptions) -> Result<Page<Project>>;

    /// Every Project with a subscription matching `event`.
    async fn list_subscribers(&self, event: &Event) -> Result<Vec<Project>>;

    async fn get_project(&self, id: &str) -> Result<Project>;

    async fn update_project(&self, project: &Project) -> Result<()>;

    async fn delete_project(&self, id: &str) -> Result<()>;
}

#[async_trait]
pub trait EventsStore: Clone + Send + Sync + 'static {
    async fn create_event(&self, event: &Event) -> Result<()>;

    /// Newest first.
    async fn list_events(&self, selector: &EventsSelector, opts: &ListOptions)
        -> Result<Page<Event>>;

    async fn get_event(&self, id: &str) -> Result<Event>;

    async fn get_event_by_hashed_worker_token(&self, hashed_token: &str) -> Result<Event>;

    /// PENDING becomes CANCELED, RUNNING becomes ABORTED, anything else is a
    /// Conflict. Returns the updated Event and records a pending cleanup for
    /// it.
    async fn cancel_event(&self, id: &str, at: DateTime<Utc>) -> Result<Event>;

    /// Applies the single-event rule to every selected Event that is still
    /// PENDING or RUNNING. Returns the Events that changed.
    async fn cancel_events(&self, selector: &EventsSelector, at: DateTime<Utc>)
        -> Result<Vec<Event>>;

    /// Returns the removed Event and records a pending cleanup for it.
    async fn delete_event(&self, id: &str) -> Result<Event>;

    /// Returns the removed Events.
    async fn delete_events(&self, selector: &EventsSelector) -> Result<Vec<Event>>;
}

/// Substrate teardown still owed for canceled and deleted Events
///
/// Entries are written by the cancel and delete operations of
/// [`EventsStore`] and outlive the Events themselves.
#[async_trait]
pub trait CleanupsStore: Clone + Send + Sync + 'static {
    /// Ordered by Event id.
    async fn pending_cleanups(&self) -> Result<Vec<Event>>;

    /// Forget the entry once the substrate objects are gone. Completing an
    /// unknown Event succeeds.
    async fn complete_cleanup(&self, event_id: &str) -> Result<()>;
}

#[async_trait]
pub trait WorkersStore: Clone + Send + Sync + 'static {
    async fn update_worker_spec(&self, event_id: &str, spec: &WorkerSpec) -> Result<()>;

    /// Conflict unless the stored phase may move to `status.phase`.
    async fn update_worker_status(&self, event_id: &str, status: &WorkerStatus) -> Result<()>;

    /// Replace the stored token hash after a token is reissued.
    async fn update_worker_hashed_token(&self, event_id: &str, hashed_token: &str) -> Result<()>;

    /// Record that the substrate accepted the Worker's dispatch.
    async fn mark_worker_scheduled(&self, event_id: &str) -> Result<()>;
}

#[async_trait]
pub trait JobsStore: Clone + Send + Sync + 'static {
    /// Adds a PENDING Job. Conflict if the name is taken.
    async fn create_job(
        &self,
        event_id: &str,
        name: &str,
        spec: &JobSpec,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Conflict unless the stored phase may move to `status.phase`.
    async fn update_job_status(&self, event_id: &str, name: &str, status: &JobStatus)
        -> Result<()>;

    /// Record that the substrate accepted the Job's dispatch.
    async fn mark_job_scheduled(&self, event_id: &str, name: &str) -> Result<()>;
}
