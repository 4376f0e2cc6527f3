// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch reconciliation
//!
//! Events are persisted before they are scheduled, and nothing spans both
//! steps. Workers and Jobs whose schedule call never succeeded stay PENDING
//! with `scheduled == false`; this pass finds the ones older than the grace
//! period and schedules them again. Items whose first dispatch is still
//! running (see [`InFlight`]) are left for a later pass.

use crate::inflight::InFlight;
use crate::services::{issue_worker_token, ServiceDeps, Store};
use crate::substrate::Substrate;
use convoy_core::{
    Clock, Event, EventsSelector, JobPhase, ListOptions, Result, ResultExt, WorkerPhase,
};
use std::time::Duration;

const PAGE_SIZE: usize = 100;

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub workers: usize,
    pub jobs: usize,
    pub failures: usize,
}

#[derive(Clone)]
pub struct DispatchReconciler<St, Su, C> {
    store: St,
    substrate: Su,
    clock: C,
    inflight: InFlight,
    grace: chrono::Duration,
}

impl<St, Su, C> DispatchReconciler<St, Su, C>
where
    St: Store,
    Su: Substrate,
    C: Clock,
{
    pub fn new<I>(deps: &ServiceDeps<St, Su, C, I>, grace: Duration) -> Self {
        Self {
            store: deps.store.clone(),
            substrate: deps.substrate.clone(),
            clock: deps.clock.clone(),
            inflight: deps.inflight.clone(),
            grace: chrono::Duration::from_std(grace).unwrap_or(chrono::Duration::zero()),
        }
    }

    /// Re-schedule every stale, unscheduled Worker and Job.
    ///
    /// Per-item failures are logged and counted; only a failure to list
    /// Events aborts the pass.
    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        let cutoff = self.clock.now() - self.grace;
        let selector = EventsSelector::default()
            .with_phases(&[WorkerPhase::Pending, WorkerPhase::Running]);
        let mut opts = ListOptions {
            limit: PAGE_SIZE,
            continue_after: None,
        };
        let mut report = ReconcileReport::default();

        loop {
            let page = self
                .store
                .list_events(&selector, &opts)
                .await
                .context(|| "list active events")?;

            for event in page.items {
                let stale = |created: Option<chrono::DateTime<chrono::Utc>>| {
                    created.is_some_and(|at| at <= cutoff)
                };

                if event.phase() == WorkerPhase::Pending
                    && !event.worker.scheduled
                    && stale(event.created)
                    && !self.dispatching(&InFlight::worker_key(event.id.as_str()))
                {
                    match self.reschedule_worker(event.clone()).await {
                        Ok(()) => report.workers += 1,
                        Err(e) => {
                            report.failures += 1;
                            tracing::warn!(event_id = %event.id, error = %e, "worker re-dispatch failed");
                        }
                    }
                }

                let stranded: Vec<String> = event
                    .worker
                    .jobs
                    .values()
                    .filter(|job| {
                        job.status.phase == JobPhase::Pending
                            && !job.scheduled
                            && stale(job.created)
                            && !self.dispatching(&InFlight::job_key(event.id.as_str(), &job.name))
                    })
                    .map(|job| job.name.clone())
                    .collect();
                for name in stranded {
                    match self.reschedule_job(&event, &name).await {
                        Ok(()) => report.jobs += 1,
                        Err(e) => {
                            report.failures += 1;
                            tracing::warn!(event_id = %event.id, job = %name, error = %e, "job re-dispatch failed");
                        }
                    }
                }
            }

            match page.continue_after {
                Some(next) => opts.continue_after = Some(next),
                None => break,
            }
        }

        if report != ReconcileReport::default() {
            tracing::info!(
                workers = report.workers,
                jobs = report.jobs,
                failures = report.failures,
                "dispatch reconciled",
            );
        }
        Ok(report)
    }

    fn dispatching(&self, key: &str) -> bool {
        let busy = self.inflight.contains(key);
        if busy {
            tracing::debug!(key, "dispatch still in flight, skipping");
        }
        busy
    }

    /// The original token was never persisted, so a new one is issued and
    /// its hash replaces the old one before the Worker is scheduled again.
    async fn reschedule_worker(&self, mut event: Event) -> Result<()> {
        let project = self
            .store
            .get_project(event.project())
            .await
            .context(|| format!("retrieve project {}", event.project()))?;

        let (token, hashed_token) = issue_worker_token();
        self.store
            .update_worker_hashed_token(event.id.as_str(), &hashed_token)
            .await
            .context(|| format!("reissue token for event {}", event.id))?;
        event.worker.token = Some(token);
        event.worker.hashed_token = hashed_token;

        self.substrate
            .schedule_worker(&project, &event)
            .await
            .context(|| format!("schedule worker for event {}", event.id))?;
        self.store
            .mark_worker_scheduled(event.id.as_str())
            .await
            .context(|| format!("mark worker for event {} scheduled", event.id))?;
        tracing::info!(event_id = %event.id, "worker re-dispatched");
        Ok(())
    }

    async fn reschedule_job(&self, event: &Event, job_name: &str) -> Result<()> {
        let project = self
            .store
            .get_project(event.project())
            .await
            .context(|| format!("retrieve project {}", event.project()))?;
        self.substrate
            .schedule_job(&project, event, job_name)
            .await
            .context(|| format!("schedule event {} job {}", event.id, job_name))?;
        self.store
            .mark_job_scheduled(event.id.as_str(), job_name)
            .await
            .context(|| format!("mark event {} job {} scheduled", event.id, job_name))?;
        tracing::info!(event_id = %event.id, job = job_name, "job re-dispatched");
        Ok(())
    }
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
