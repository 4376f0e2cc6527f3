// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake substrate for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::Substrate;
use async_trait::async_trait;
use convoy_core::{Error, Event, KubernetesConfig, Project, Result, Secret};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Recorded substrate call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubstrateCall {
    CreateProject { project_id: String },
    UpdateProject { project_id: String },
    DeleteProject { project_id: String },
    ScheduleWorker {
        event_id: String,
        /// Token the Worker would have been handed.
        token: Option<String>,
    },
    StartWorker { event_id: String },
    ScheduleJob { event_id: String, job: String },
    StartJob { event_id: String, job: String },
    DeleteWorkerAndJobs { event_id: String },
    ListSecrets { project_id: String },
    SetSecret { project_id: String, key: String },
    UnsetSecret { project_id: String, key: String },
}

/// Operation selector for failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubstrateOp {
    CreateProject,
    UpdateProject,
    DeleteProject,
    ScheduleWorker,
    StartWorker,
    ScheduleJob,
    StartJob,
    DeleteWorkerAndJobs,
    ListSecrets,
    SetSecret,
    UnsetSecret,
}

impl SubstrateCall {
    fn op(&self) -> SubstrateOp {
        match self {
            SubstrateCall::CreateProject { .. } => SubstrateOp::CreateProject,
            SubstrateCall::UpdateProject { .. } => SubstrateOp::UpdateProject,
            SubstrateCall::DeleteProject { .. } => SubstrateOp::DeleteProject,
            SubstrateCall::ScheduleWorker { .. } => SubstrateOp::ScheduleWorker,
            SubstrateCall::StartWorker { .. } => SubstrateOp::StartWorker,
            SubstrateCall::ScheduleJob { .. } => SubstrateOp::ScheduleJob,
            SubstrateCall::StartJob { .. } => SubstrateOp::StartJob,
            SubstrateCall::DeleteWorkerAndJobs { .. } => SubstrateOp::DeleteWorkerAndJobs,
            SubstrateCall::ListSecrets { .. } => SubstrateOp::ListSecrets,
            SubstrateCall::SetSecret { .. } => SubstrateOp::SetSecret,
            SubstrateCall::UnsetSecret { .. } => SubstrateOp::UnsetSecret,
        }
    }
}

#[derive(Default)]
struct FakeSubstrateState {
    calls: Vec<SubstrateCall>,
    failures: HashMap<SubstrateOp, u32>,
    /// Project secrets by Project id.
    secrets: HashMap<String, BTreeMap<String, String>>,
}

/// Substrate that records calls and fails on demand
#[derive(Clone, Default)]
pub struct FakeSubstrate {
    inner: Arc<Mutex<FakeSubstrateState>>,
}

impl FakeSubstrate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<SubstrateCall> {
        self.inner.lock().calls.clone()
    }

    /// Calls of one kind, in order.
    pub fn calls_to(&self, op: SubstrateOp) -> Vec<SubstrateCall> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| c.op() == op)
            .cloned()
            .collect()
    }

    /// Fail the next `n` calls to `op` with an internal error.
    pub fn fail(&self, op: SubstrateOp, n: u32) {
        self.inner.lock().failures.insert(op, n);
    }

    /// Secrets currently set on a Project.
    pub fn secrets(&self, project_id: &str) -> BTreeMap<String, String> {
        self.inner
            .lock()
            .secrets
            .get(project_id)
            .cloned()
            .unwrap_or_default()
    }

    fn record(&self, call: SubstrateCall) -> Result<()> {
        let mut inner = self.inner.lock();
        let op = call.op();
        inner.calls.push(call);
        match inner.failures.get_mut(&op) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(Error::internal(format!("injected {:?} failure", op)))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Substrate for FakeSubstrate {
    fn pre_create_project(&self, mut project: Project) -> Result<Project> {
        project.kubernetes = Some(KubernetesConfig {
            namespace: format!("convoy-{}-fake", project.id),
        });
        Ok(project)
    }

    async fn create_project(&self, project: &Project) -> Result<()> {
        self.record(SubstrateCall::CreateProject {
            project_id: project.id.to_string(),
        })
    }

    fn pre_update_project(&self, original: &Project, mut updated: Project) -> Result<Project> {
        updated.kubernetes = original.kubernetes.clone();
        Ok(updated)
    }

    async fn update_project(&self, project: &Project) -> Result<()> {
        self.record(SubstrateCall::UpdateProject {
            project_id: project.id.to_string(),
        })
    }

    async fn delete_project(&self, project: &Project) -> Result<()> {
        self.record(SubstrateCall::DeleteProject {
            project_id: project.id.to_string(),
        })
    }

    fn pre_create_event(&self, project: &Project, mut event: Event) -> Result<Event> {
        event.kubernetes = project.kubernetes.clone();
        Ok(event)
    }

    async fn schedule_worker(&self, _project: &Project, event: &Event) -> Result<()> {
        self.record(SubstrateCall::ScheduleWorker {
            event_id: event.id.to_string(),
            token: event.worker.token.clone(),
        })
    }

    async fn start_worker(&self, event: &Event) -> Result<()> {
        self.record(SubstrateCall::StartWorker {
            event_id: event.id.to_string(),
        })
    }

    async fn schedule_job(&self, _project: &Project, event: &Event, job_name: &str) -> Result<()> {
        self.record(SubstrateCall::ScheduleJob {
            event_id: event.id.to_string(),
            job: job_name.to_string(),
        })
    }

    async fn start_job(&self, event: &Event, job_name: &str) -> Result<()> {
        self.record(SubstrateCall::StartJob {
            event_id: event.id.to_string(),
            job: job_name.to_string(),
        })
    }

    async fn list_secrets(&self, project: &Project) -> Result<Vec<String>> {
        self.record(SubstrateCall::ListSecrets {
            project_id: project.id.to_string(),
        })?;
        Ok(self.secrets(project.id.as_str()).into_keys().collect())
    }

    async fn set_secret(&self, project: &Project, secret: &Secret) -> Result<()> {
        self.record(SubstrateCall::SetSecret {
            project_id: project.id.to_string(),
            key: secret.key.clone(),
        })?;
        self.inner
            .lock()
            .secrets
            .entry(project.id.to_string())
            .or_default()
            .insert(secret.key.clone(), secret.value.clone());
        Ok(())
    }

    async fn unset_secret(&self, project: &Project, key: &str) -> Result<()> {
        self.record(SubstrateCall::UnsetSecret {
            project_id: project.id.to_string(),
            key: key.to_string(),
        })?;
        if let Some(secrets) = self.inner.lock().secrets.get_mut(project.id.as_str()) {
            secrets.remove(key);
        }
        Ok(())
    }

    async fn delete_worker_and_jobs(&self, event: &Event) -> Result<()> {
        self.record(SubstrateCall::DeleteWorkerAndJobs {
            event_id: event.id.to_string(),
        })
    }
}
