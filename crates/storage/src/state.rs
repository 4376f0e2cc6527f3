// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plain in-memory records and the rules for mutating them

use chrono::{DateTime, Utc};
use convoy_core::{
    Error, Event, EventsSelector, JobPhase, JobSpec, JobStatus, Job, ListOptions, Page, Project,
    ProjectId, ResourceKind, Result, WorkerPhase, WorkerSpec, WorkerStatus,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Every Project and Event, keyed by id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreState {
    #[serde(default)]
    pub projects: BTreeMap<String, Project>,
    #[serde(default)]
    pub events: BTreeMap<String, Event>,
    /// Canceled or deleted Events whose substrate objects may remain.
    #[serde(default)]
    pub pending_cleanups: BTreeMap<String, Event>,
}

/// Slice `items` after the `continue_after` id and cut to the page size.
fn paginate<T: Clone>(items: Vec<T>, id_of: impl Fn(&T) -> &str, opts: &ListOptions) -> Page<T> {
    let start = match &opts.continue_after {
        Some(after) => items
            .iter()
            .position(|item| id_of(item) == after)
            .map(|i| i + 1)
            .unwrap_or(items.len()),
        None => 0,
    };
    let rest = &items[start..];
    let limit = opts.effective_limit();
    let page: Vec<T> = rest.iter().take(limit).cloned().collect();
    let remaining = rest.len().saturating_sub(page.len());
    let continue_after = if remaining > 0 {
        page.last().map(|item| id_of(item).to_string())
    } else {
        None
    };
    Page {
        items: page,
        continue_after,
        remaining,
    }
}

fn cancel_in_place(event: &mut Event, at: DateTime<Utc>) -> bool {
    let next = match event.worker.status.phase {
        WorkerPhase::Pending => WorkerPhase::Canceled,
        WorkerPhase::Running => WorkerPhase::Aborted,
        _ => return false,
    };
    event.worker.status.phase = next;
    event.worker.status.ended = Some(at);
    event.canceled = Some(at);
    true
}

impl StoreState {
    // ── Projects ────────────────────────────────────────────────────────────

    pub fn insert_project(&mut self, project: Project) -> Result<()> {
        if self.projects.contains_key(project.id.as_str()) {
            return Err(Error::conflict(
                ResourceKind::Project,
                project.id.as_str(),
                "a project with this id already exists",
            ));
        }
        self.projects.insert(project.id.to_string(), project);
        Ok(())
    }

    pub fn projects_page(&self, opts: &ListOptions) -> Page<Project> {
        let all: Vec<Project> = self.projects.values().cloned().collect();
        paginate(all, |p| p.id.as_str(), opts)
    }

    pub fn subscribers(&self, event: &Event) -> Vec<Project> {
        self.projects
            .values()
            .filter(|p| p.subscribes_to(event))
            .cloned()
            .collect()
    }

    pub fn project(&self, id: &str) -> Result<&Project> {
        self.projects
            .get(id)
            .ok_or_else(|| Error::not_found(ResourceKind::Project, id))
    }

    pub fn replace_project(&mut self, project: Project) -> Result<()> {
        match self.projects.get_mut(project.id.as_str()) {
            Some(existing) => {
                *existing = project;
                Ok(())
            }
            None => Err(Error::not_found(ResourceKind::Project, project.id.as_str())),
        }
    }

    /// Removing a Project also removes its Events and their pending
    /// cleanups; the Project's namespace takes everything with it.
    pub fn remove_project(&mut self, id: &str) -> Result<Project> {
        let project = self
            .projects
            .remove(id)
            .ok_or_else(|| Error::not_found(ResourceKind::Project, id))?;
        let owner = ProjectId::new(id);
        self.events
            .retain(|_, e| e.project_id.as_ref() != Some(&owner));
        self.pending_cleanups
            .retain(|_, e| e.project_id.as_ref() != Some(&owner));
        Ok(project)
    }

    // ── Events ──────────────────────────────────────────────────────────────

    /// The one-time Worker token is dropped; only its hash is kept.
    pub fn insert_event(&mut self, mut event: Event) -> Result<()> {
        if self.events.contains_key(event.id.as_str()) {
            return Err(Error::conflict(
                ResourceKind::Event,
                event.id.as_str(),
                "an event with this id already exists",
            ));
        }
        event.worker.token = None;
        self.events.insert(event.id.to_string(), event);
        Ok(())
    }

    /// Newest first; ties broken by id.
    pub fn events_page(&self, selector: &EventsSelector, opts: &ListOptions) -> Page<Event> {
        let mut matching: Vec<Event> = self
            .events
            .values()
            .filter(|e| selector.matches(e))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created.cmp(&a.created).then_with(|| a.id.cmp(&b.id)));
        paginate(matching, |e| e.id.as_str(), opts)
    }

    pub fn event(&self, id: &str) -> Result<&Event> {
        self.events
            .get(id)
            .ok_or_else(|| Error::not_found(ResourceKind::Event, id))
    }

    fn event_mut(&mut self, id: &str) -> Result<&mut Event> {
        self.events
            .get_mut(id)
            .ok_or_else(|| Error::not_found(ResourceKind::Event, id))
    }

    pub fn event_by_hashed_token(&self, hashed_token: &str) -> Result<&Event> {
        self.events
            .values()
            .find(|e| !hashed_token.is_empty() && e.worker.hashed_token == hashed_token)
            .ok_or_else(|| Error::not_found(ResourceKind::Event, "(by worker token)"))
    }

    pub fn cancel_event(&mut self, id: &str, at: DateTime<Utc>) -> Result<Event> {
        let event = self.event_mut(id)?;
        if !cancel_in_place(event, at) {
            return Err(Error::conflict(
                ResourceKind::Event,
                id,
                "event was not canceled because it was already in a terminal state",
            ));
        }
        let event = event.clone();
        self.owe_cleanup(&event);
        Ok(event)
    }

    /// Only PENDING and RUNNING Events are touched, whatever the selector says.
    pub fn cancel_matching(&mut self, selector: &EventsSelector, at: DateTime<Utc>) -> Vec<Event> {
        let canceled: Vec<Event> = self
            .events
            .values_mut()
            .filter(|e| selector.matches(e))
            .filter_map(|e| cancel_in_place(e, at).then(|| e.clone()))
            .collect();
        for event in &canceled {
            self.owe_cleanup(event);
        }
        canceled
    }

    pub fn remove_event(&mut self, id: &str) -> Result<Event> {
        let event = self
            .events
            .remove(id)
            .ok_or_else(|| Error::not_found(ResourceKind::Event, id))?;
        self.owe_cleanup(&event);
        Ok(event)
    }

    pub fn remove_matching(&mut self, selector: &EventsSelector) -> Vec<Event> {
        let ids: Vec<String> = self
            .events
            .values()
            .filter(|e| selector.matches(e))
            .map(|e| e.id.to_string())
            .collect();
        let removed: Vec<Event> = ids
            .iter()
            .filter_map(|id| self.events.remove(id))
            .collect();
        for event in &removed {
            self.owe_cleanup(event);
        }
        removed
    }

    // ── Cleanups ────────────────────────────────────────────────────────────

    fn owe_cleanup(&mut self, event: &Event) {
        self.pending_cleanups
            .insert(event.id.to_string(), event.clone());
    }

    pub fn cleanups(&self) -> Vec<Event> {
        self.pending_cleanups.values().cloned().collect()
    }

    pub fn settle_cleanup(&mut self, event_id: &str) {
        self.pending_cleanups.remove(event_id);
    }

    // ── Workers ─────────────────────────────────────────────────────────────

    pub fn set_worker_spec(&mut self, event_id: &str, spec: &WorkerSpec) -> Result<()> {
        self.event_mut(event_id)?.worker.spec = spec.clone();
        Ok(())
    }

    /// Phases only move forward; see [`WorkerPhase::can_transition_to`].
    pub fn set_worker_status(&mut self, event_id: &str, status: &WorkerStatus) -> Result<()> {
        let worker = &mut self.event_mut(event_id)?.worker;
        let current = worker.status.phase;
        if !current.can_transition_to(status.phase) {
            return Err(Error::conflict(
                ResourceKind::Event,
                event_id,
                format!(
                    "Event {:?} worker cannot move from {} to {}.",
                    event_id, current, status.phase
                ),
            ));
        }
        worker.status = status.clone();
        Ok(())
    }

    pub fn set_worker_hashed_token(&mut self, event_id: &str, hashed_token: &str) -> Result<()> {
        self.event_mut(event_id)?.worker.hashed_token = hashed_token.to_string();
        Ok(())
    }

    pub fn set_worker_scheduled(&mut self, event_id: &str) -> Result<()> {
        self.event_mut(event_id)?.worker.scheduled = true;
        Ok(())
    }

    // ── Jobs ────────────────────────────────────────────────────────────────

    pub fn insert_job(
        &mut self,
        event_id: &str,
        name: &str,
        spec: &JobSpec,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let event = self.event_mut(event_id)?;
        if event.worker.jobs.contains_key(name) {
            return Err(Error::conflict(
                ResourceKind::Job,
                name,
                format!("event {:?} already has a job named {:?}", event_id, name),
            ));
        }
        event.worker.jobs.insert(
            name.to_string(),
            Job {
                name: name.to_string(),
                created: Some(at),
                spec: spec.clone(),
                status: JobStatus {
                    phase: JobPhase::Pending,
                    ..Default::default()
                },
                scheduled: false,
            },
        );
        Ok(())
    }

    fn job_mut(&mut self, event_id: &str, name: &str) -> Result<&mut Job> {
        self.event_mut(event_id)?
            .worker
            .jobs
            .get_mut(name)
            .ok_or_else(|| Error::not_found(ResourceKind::Job, name))
    }

    /// Phases only move forward; see [`JobPhase::can_transition_to`].
    pub fn set_job_status(&mut self, event_id: &str, name: &str, status: &JobStatus) -> Result<()> {
        let job = self.job_mut(event_id, name)?;
        let current = job.status.phase;
        if !current.can_transition_to(status.phase) {
            return Err(Error::conflict(
                ResourceKind::Job,
                name,
                format!(
                    "Event {:?} job {:?} cannot move from {} to {}.",
                    event_id, name, current, status.phase
                ),
            ));
        }
        job.status = status.clone();
        Ok(())
    }

    pub fn set_job_scheduled(&mut self, event_id: &str, name: &str) -> Result<()> {
        self.job_mut(event_id, name)?.scheduled = true;
        Ok(())
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
