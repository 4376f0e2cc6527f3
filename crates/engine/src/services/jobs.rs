// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job lifecycle: creation under Worker policy, start, status, watch

use super::{ServiceDeps, Store};
use crate::inflight::InFlight;
use crate::substrate::Substrate;
use crate::watch::{poll_every, StatusStream};
use convoy_core::{
    authorize, Clock, Error, Event, JobPhase, JobSpec, JobStatus, Principal, ResourceKind, Result,
    ResultExt, Role,
};
use std::time::Duration;

#[derive(Clone)]
pub struct JobsService<St, Su, C> {
    store: St,
    substrate: Su,
    clock: C,
    inflight: InFlight,
    watch_interval: Duration,
}

fn job_status(event: &Event, job_name: &str) -> Result<JobStatus> {
    event
        .worker
        .jobs
        .get(job_name)
        .map(|job| job.status.clone())
        .ok_or_else(|| Error::not_found(ResourceKind::Job, job_name))
}

/// Reject specs that ask for more than the Worker allows.
fn check_policies(event: &Event, job_name: &str, spec: &JobSpec) -> Result<()> {
    let worker = &event.worker.spec;
    let features = spec.features();

    if features.privileged && !worker.allows_privileged_jobs() {
        return Err(Error::unauthorized(
            "Worker configuration forbids jobs from utilizing privileged containers.",
        ));
    }
    if features.docker_socket && !worker.allows_docker_socket_jobs() {
        return Err(Error::unauthorized(
            "Worker configuration forbids jobs from mounting the Docker socket.",
        ));
    }
    if features.workspace && !worker.use_workspace {
        return Err(Error::conflict(
            ResourceKind::Job,
            job_name,
            "The job requested access to the shared workspace, but Worker \
             configuration has not enabled this feature.",
        ));
    }
    Ok(())
}

impl<St, Su, C> JobsService<St, Su, C>
where
    St: Store,
    Su: Substrate,
    C: Clock,
{
    pub fn new<I>(deps: &ServiceDeps<St, Su, C, I>, watch_interval: Duration) -> Self {
        Self {
            store: deps.store.clone(),
            substrate: deps.substrate.clone(),
            clock: deps.clock.clone(),
            inflight: deps.inflight.clone(),
            watch_interval,
        }
    }

    async fn event(&self, event_id: &str) -> Result<Event> {
        self.store
            .get_event(event_id)
            .await
            .context(|| format!("retrieve event {} from store", event_id))
    }

    /// Add a Job to the calling Worker's Event and dispatch it.
    pub async fn create(
        &self,
        principal: &Principal,
        event_id: &str,
        job_name: &str,
        spec: JobSpec,
    ) -> Result<()> {
        authorize(principal, &[Role::worker(event_id)])?;

        let event = self.event(event_id).await?;
        if event.worker.jobs.contains_key(job_name) {
            return Err(Error::conflict(
                ResourceKind::Job,
                job_name,
                format!(
                    "Event {:?} already has a job named {:?}.",
                    event_id, job_name
                ),
            ));
        }
        check_policies(&event, job_name, &spec)?;

        let _dispatching = self.inflight.begin(InFlight::job_key(event_id, job_name));
        self.store
            .create_job(event_id, job_name, &spec, self.clock.now())
            .await
            .context(|| format!("save event {} job {} in store", event_id, job_name))?;

        let project = self
            .store
            .get_project(event.project())
            .await
            .context(|| format!("retrieve project {} from store", event.project()))?;
        // Re-read so the substrate sees the Job as stored.
        let event = self.event(event_id).await?;
        self.substrate
            .schedule_job(&project, &event, job_name)
            .await
            .context(|| format!("schedule event {} job {}", event_id, job_name))?;
        self.store
            .mark_job_scheduled(event_id, job_name)
            .await
            .context(|| format!("mark event {} job {} scheduled", event_id, job_name))?;

        tracing::info!(event_id, job = job_name, "job created");
        Ok(())
    }

    /// Launch a PENDING Job on the substrate.
    pub async fn start(&self, principal: &Principal, event_id: &str, job_name: &str) -> Result<()> {
        authorize(principal, &[Role::scheduler()])?;

        let event = self.event(event_id).await?;
        let status = job_status(&event, job_name)?;
        if status.phase != JobPhase::Pending {
            return Err(Error::conflict(
                ResourceKind::Job,
                job_name,
                format!(
                    "Event {:?} job {:?} has already been started.",
                    event_id, job_name
                ),
            ));
        }

        self.substrate
            .start_job(&event, job_name)
            .await
            .context(|| format!("start event {} job {}", event_id, job_name))?;
        tracing::info!(event_id, job = job_name, "job started");
        Ok(())
    }

    pub async fn get_status(
        &self,
        principal: &Principal,
        event_id: &str,
        job_name: &str,
    ) -> Result<JobStatus> {
        authorize(principal, &[Role::reader()])?;
        job_status(&self.event(event_id).await?, job_name)
    }

    /// Stream the Job's status every watch interval until dropped. The Job
    /// must exist when the watch begins.
    pub async fn watch_status(
        &self,
        principal: &Principal,
        event_id: &str,
        job_name: &str,
    ) -> Result<StatusStream<JobStatus>> {
        authorize(principal, &[Role::reader()])?;
        job_status(&self.event(event_id).await?, job_name)?;

        let store = self.store.clone();
        let event_id = event_id.to_string();
        let name = job_name.to_string();
        Ok(poll_every(
            self.watch_interval,
            format!("job {}:{}", event_id, job_name),
            move || {
                let store = store.clone();
                let event_id = event_id.clone();
                let name = name.clone();
                async move { job_status(&store.get_event(&event_id).await?, &name) }
            },
        ))
    }

    /// Record a status reported by the observer. Phases only move forward;
    /// the store refuses anything else with a conflict.
    pub async fn update_status(
        &self,
        principal: &Principal,
        event_id: &str,
        job_name: &str,
        status: JobStatus,
    ) -> Result<()> {
        authorize(principal, &[Role::observer()])?;

        self.store
            .update_job_status(event_id, job_name, &status)
            .await
            .context(|| format!("update status of event {} job {}", event_id, job_name))?;
        tracing::info!(event_id, job = job_name, phase = %status.phase, "job status updated");
        Ok(())
    }
}

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod tests;
