// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution substrate abstraction
//!
//! Services sequence the calls: pre-create, then persist, then schedule.
//! Implementations never retry on their own.

mod cluster;
pub mod labels;
mod pods;

pub use cluster::{ClusterSubstrate, ClusterSubstrateConfig};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeSubstrate, SubstrateCall, SubstrateOp};

use async_trait::async_trait;
use convoy_core::{Event, Project, Result, Secret};

/// Backend that provisions tenants and runs Workers and Jobs
#[async_trait]
pub trait Substrate: Clone + Send + Sync + 'static {
    /// Attach substrate identity to a new Project. No side effects.
    fn pre_create_project(&self, project: Project) -> Result<Project>;

    /// Provision the Project's isolation boundary.
    async fn create_project(&self, project: &Project) -> Result<()>;

    /// Carry substrate identity from `original` onto `updated`. No side
    /// effects.
    fn pre_update_project(&self, original: &Project, updated: Project) -> Result<Project>;

    async fn update_project(&self, project: &Project) -> Result<()>;

    /// Tear down everything the Project owns.
    async fn delete_project(&self, project: &Project) -> Result<()>;

    /// Attach substrate identity from `project` to a new Event. No side
    /// effects.
    fn pre_create_event(&self, project: &Project, event: Event) -> Result<Event>;

    /// Snapshot configuration for the Worker and enqueue it. Safe to repeat.
    async fn schedule_worker(&self, project: &Project, event: &Event) -> Result<()>;

    /// Launch the Worker's execution unit.
    async fn start_worker(&self, event: &Event) -> Result<()>;

    /// Enqueue a Job. Safe to repeat.
    async fn schedule_job(&self, project: &Project, event: &Event, job_name: &str) -> Result<()>;

    /// Launch the Job's execution unit.
    async fn start_job(&self, event: &Event, job_name: &str) -> Result<()>;

    /// Keys of the Project's secrets, sorted.
    async fn list_secrets(&self, project: &Project) -> Result<Vec<String>>;

    /// Add or overwrite one Project secret. Workers scheduled afterwards see
    /// it; ones already scheduled keep their snapshot.
    async fn set_secret(&self, project: &Project, secret: &Secret) -> Result<()>;

    /// Remove one Project secret. Removing an absent key succeeds.
    async fn unset_secret(&self, project: &Project, key: &str) -> Result<()>;

    /// Delete every object tagged with the Event. Deleting what is already
    /// gone succeeds.
    async fn delete_worker_and_jobs(&self, event: &Event) -> Result<()>;
}
