// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event intake, fan-out, lookup, cancellation and deletion

use super::{hash_worker_token, issue_worker_token, ServiceDeps, Store};
use crate::cleanup::CleanupPool;
use crate::inflight::InFlight;
use crate::substrate::Substrate;
use convoy_core::{
    authorize, BulkResult, Clock, Error, Event, EventId, EventsSelector, IdGen, ListOptions, Page,
    Principal, Project, ProjectId, Result, ResultExt, Role, Worker, WorkerPhase, WorkerStatus,
};

#[derive(Clone)]
pub struct EventsService<St, Su, C, I> {
    store: St,
    substrate: Su,
    clock: C,
    ids: I,
    inflight: InFlight,
    cleanup: CleanupPool,
}

/// Bulk operations must name a Project and at least one phase.
fn require_qualified(selector: &EventsSelector) -> Result<&ProjectId> {
    let project_id = selector
        .project_id
        .as_ref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| Error::bad_request("Required value ProjectID is missing."))?;
    Ok(project_id)
}

fn require_phases(selector: &EventsSelector) -> Result<()> {
    if selector.worker_phases.is_empty() {
        return Err(Error::bad_request(
            "At least one worker phase must be specified.",
        ));
    }
    Ok(())
}

impl<St, Su, C, I> EventsService<St, Su, C, I>
where
    St: Store,
    Su: Substrate,
    C: Clock,
    I: IdGen,
{
    pub fn new(deps: &ServiceDeps<St, Su, C, I>, cleanup: CleanupPool) -> Self {
        Self {
            store: deps.store.clone(),
            substrate: deps.substrate.clone(),
            clock: deps.clock.clone(),
            ids: deps.ids.clone(),
            inflight: deps.inflight.clone(),
            cleanup,
        }
    }

    /// Accept an Event.
    ///
    /// With a Project named, creates exactly one Event for it. Without one,
    /// creates one Event per subscribed Project, in store order; no
    /// subscribers yields an empty list. Returned Events carry their
    /// Worker's one-time token.
    pub async fn create(&self, principal: &Principal, mut event: Event) -> Result<Vec<Event>> {
        if event.project_id.as_ref().is_some_and(|p| !p.is_empty()) {
            return Ok(vec![self.create_for_project(principal, event).await?]);
        }
        event.project_id = None;
        authorize(principal, &[Role::event_creator(&event.source)])?;

        let subscribers = self
            .store
            .list_subscribers(&event)
            .await
            .context(|| "retrieve subscribed projects")?;
        tracing::debug!(
            source = %event.source,
            event_type = %event.event_type,
            subscribers = subscribers.len(),
            "fanning out event",
        );

        let mut created = Vec::with_capacity(subscribers.len());
        for project in subscribers {
            let mut targeted = event.clone();
            targeted.project_id = Some(project.id);
            created.push(self.create_for_project(principal, targeted).await?);
        }
        Ok(created)
    }

    async fn create_for_project(&self, principal: &Principal, mut event: Event) -> Result<Event> {
        let project_id = event.project().to_string();
        authorize(
            principal,
            &[
                Role::project_user(&project_id),
                Role::event_creator(&event.source),
            ],
        )?;

        event.created = Some(self.clock.now());
        let project = self
            .store
            .get_project(&project_id)
            .await
            .context(|| format!("retrieve project {} from store", project_id))?;

        event.id = EventId::new(self.ids.next());
        let _dispatching = self.inflight.begin(InFlight::worker_key(event.id.as_str()));
        event.canceled = None;
        let (token, hashed_token) = issue_worker_token();
        event.worker = Worker {
            spec: project.spec.worker_template.resolve(event.git.as_ref()),
            status: WorkerStatus {
                phase: WorkerPhase::Pending,
                ..Default::default()
            },
            token: Some(token),
            hashed_token,
            scheduled: false,
            jobs: Default::default(),
        };

        let event = self
            .substrate
            .pre_create_event(&project, event)
            .context(|| "pre-create event on the substrate")?;

        self.store
            .create_event(&event)
            .await
            .context(|| format!("store new event {}", event.id))?;

        self.dispatch(&project, &event).await?;
        tracing::info!(event_id = %event.id, project_id = %project.id, "event created");

        let mut event = event;
        event.worker.scheduled = true;
        Ok(event)
    }

    /// Schedule the Worker and record that the substrate accepted it.
    async fn dispatch(&self, project: &Project, event: &Event) -> Result<()> {
        self.substrate
            .schedule_worker(project, event)
            .await
            .context(|| format!("schedule worker for event {}", event.id))?;
        self.store
            .mark_worker_scheduled(event.id.as_str())
            .await
            .context(|| format!("mark worker for event {} scheduled", event.id))
    }

    /// Newest first. An empty phase list means every phase.
    pub async fn list(
        &self,
        principal: &Principal,
        selector: &EventsSelector,
        opts: &ListOptions,
    ) -> Result<Page<Event>> {
        authorize(principal, &[Role::reader()])?;
        self.store
            .list_events(selector, opts)
            .await
            .context(|| "list events")
    }

    pub async fn get(&self, principal: &Principal, id: &str) -> Result<Event> {
        authorize(principal, &[Role::reader()])?;
        self.store
            .get_event(id)
            .await
            .context(|| format!("get event {}", id))
    }

    /// Find the Event whose Worker was issued `token`.
    pub async fn get_by_worker_token(&self, principal: &Principal, token: &str) -> Result<Event> {
        authorize(principal, &[Role::reader()])?;
        self.store
            .get_event_by_hashed_worker_token(&hash_worker_token(token))
            .await
            .context(|| "get event by worker token")
    }

    /// PENDING becomes CANCELED and RUNNING becomes ABORTED. Already
    /// terminal Events are a Conflict.
    pub async fn cancel(&self, principal: &Principal, id: &str) -> Result<()> {
        let event = self
            .store
            .get_event(id)
            .await
            .context(|| format!("get event {}", id))?;
        authorize(principal, &[Role::project_user(event.project())])?;

        let canceled = self
            .store
            .cancel_event(id, self.clock.now())
            .await
            .context(|| format!("cancel event {}", id))?;
        tracing::info!(event_id = id, phase = %canceled.phase(), "event canceled");
        self.cleanup.enqueue(canceled);
        Ok(())
    }

    pub async fn cancel_many(
        &self,
        principal: &Principal,
        selector: &EventsSelector,
    ) -> Result<BulkResult> {
        let project_id = require_qualified(selector)?;
        authorize(principal, &[Role::project_user(project_id.as_str())])?;
        require_phases(selector)?;
        self.store
            .get_project(project_id.as_str())
            .await
            .context(|| format!("get project {}", project_id))?;

        let canceled = self
            .store
            .cancel_events(selector, self.clock.now())
            .await
            .context(|| format!("cancel events of project {}", project_id))?;
        let count = canceled.len();
        for event in canceled {
            self.cleanup.enqueue(event);
        }
        tracing::info!(project_id = %project_id, count, "events canceled");
        Ok(BulkResult { count })
    }

    pub async fn delete(&self, principal: &Principal, id: &str) -> Result<()> {
        let event = self
            .store
            .get_event(id)
            .await
            .context(|| format!("get event {}", id))?;
        authorize(principal, &[Role::project_user(event.project())])?;

        let deleted = self
            .store
            .delete_event(id)
            .await
            .context(|| format!("delete event {}", id))?;
        self.cleanup.enqueue(deleted);
        Ok(())
    }

    pub async fn delete_many(
        &self,
        principal: &Principal,
        selector: &EventsSelector,
    ) -> Result<BulkResult> {
        let project_id = require_qualified(selector)?;
        authorize(principal, &[Role::project_user(project_id.as_str())])?;
        require_phases(selector)?;
        self.store
            .get_project(project_id.as_str())
            .await
            .context(|| format!("get project {}", project_id))?;

        let deleted = self
            .store
            .delete_events(selector)
            .await
            .context(|| format!("delete events of project {}", project_id))?;
        let count = deleted.len();
        for event in deleted {
            self.cleanup.enqueue(event);
        }
        tracing::info!(project_id = %project_id, count, "events deleted");
        Ok(BulkResult { count })
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
