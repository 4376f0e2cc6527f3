// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker lifecycle: start, status, watch

use super::{ServiceDeps, Store};
use crate::substrate::Substrate;
use crate::watch::{poll_every, StatusStream};
use convoy_core::{
    authorize, Error, Principal, ResourceKind, Result, ResultExt, Role, WorkerPhase, WorkerStatus,
};
use std::time::Duration;

#[derive(Clone)]
pub struct WorkersService<St, Su> {
    store: St,
    substrate: Su,
    watch_interval: Duration,
}

impl<St, Su> WorkersService<St, Su>
where
    St: Store,
    Su: Substrate,
{
    pub fn new<C, I>(deps: &ServiceDeps<St, Su, C, I>, watch_interval: Duration) -> Self {
        Self {
            store: deps.store.clone(),
            substrate: deps.substrate.clone(),
            watch_interval,
        }
    }

    /// Launch a PENDING Worker on the substrate.
    pub async fn start(&self, principal: &Principal, event_id: &str) -> Result<()> {
        authorize(principal, &[Role::scheduler()])?;

        let event = self
            .store
            .get_event(event_id)
            .await
            .context(|| format!("retrieve event {} from store", event_id))?;
        if event.phase() != WorkerPhase::Pending {
            return Err(Error::conflict(
                ResourceKind::Event,
                event_id,
                format!("Event {:?} worker has already been started.", event_id),
            ));
        }

        self.substrate
            .start_worker(&event)
            .await
            .context(|| format!("start worker for event {}", event_id))?;
        tracing::info!(event_id, "worker started");
        Ok(())
    }

    pub async fn get_status(&self, principal: &Principal, event_id: &str) -> Result<WorkerStatus> {
        authorize(principal, &[Role::reader()])?;
        let event = self
            .store
            .get_event(event_id)
            .await
            .context(|| format!("retrieve event {} from store", event_id))?;
        Ok(event.worker.status)
    }

    /// Stream the Worker's status every watch interval until dropped.
    pub async fn watch_status(
        &self,
        principal: &Principal,
        event_id: &str,
    ) -> Result<StatusStream<WorkerStatus>> {
        authorize(principal, &[Role::reader()])?;
        self.store
            .get_event(event_id)
            .await
            .context(|| format!("retrieve event {} from store", event_id))?;

        let store = self.store.clone();
        let id = event_id.to_string();
        Ok(poll_every(
            self.watch_interval,
            format!("worker {}", event_id),
            move || {
                let store = store.clone();
                let id = id.clone();
                async move {
                    let event = store.get_event(&id).await?;
                    Ok::<_, Error>(event.worker.status)
                }
            },
        ))
    }

    /// Record a status reported by the observer. Phases only move forward;
    /// the store refuses anything else with a conflict.
    pub async fn update_status(
        &self,
        principal: &Principal,
        event_id: &str,
        status: WorkerStatus,
    ) -> Result<()> {
        authorize(principal, &[Role::observer()])?;

        self.store
            .update_worker_status(event_id, &status)
            .await
            .context(|| format!("update status of event {} worker in store", event_id))?;
        tracing::info!(event_id, phase = %status.phase, "worker status updated");
        Ok(())
    }
}

#[cfg(test)]
#[path = "workers_tests.rs"]
mod tests;
