// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events: the occurrences that trigger Workers

use crate::id::{EventId, ProjectId};
use crate::project::KubernetesConfig;
use crate::worker::{Worker, WorkerPhase};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type Labels = BTreeMap<String, String>;

/// Per-event override of the template's git settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventGitConfig {
    #[serde(default, rename = "cloneURL")]
    pub clone_url: String,
    #[serde(default)]
    pub commit: String,
    #[serde(default, rename = "ref")]
    pub git_ref: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default)]
    pub id: EventId,
    /// `None` asks for fan-out to every subscribed Project.
    #[serde(default, rename = "projectID", skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    pub source: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub short_title: String,
    #[serde(default)]
    pub long_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<EventGitConfig>,
    #[serde(default)]
    pub payload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes: Option<KubernetesConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canceled: Option<DateTime<Utc>>,
    #[serde(default)]
    pub worker: Worker,
}

impl Event {
    pub fn new(source: impl Into<String>, event_type: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            event_type: event_type.into(),
            ..Default::default()
        }
    }

    pub fn phase(&self) -> WorkerPhase {
        self.worker.status.phase
    }

    /// The Project this Event was bound to, or an empty string before
    /// fan-out resolved it.
    pub fn project(&self) -> &str {
        self.project_id.as_ref().map(|p| p.as_str()).unwrap_or("")
    }

    /// The namespace the substrate assigned, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.kubernetes.as_ref().map(|k| k.namespace.as_str())
    }
}

/// Filter for listing and bulk operations on Events
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventsSelector {
    pub project_id: Option<ProjectId>,
    pub source: Option<String>,
    pub worker_phases: Vec<WorkerPhase>,
}

impl EventsSelector {
    pub fn for_project(project_id: impl Into<ProjectId>) -> Self {
        Self {
            project_id: Some(project_id.into()),
            ..Default::default()
        }
    }

    pub fn with_phases(mut self, phases: &[WorkerPhase]) -> Self {
        self.worker_phases = phases.to_vec();
        self
    }

    /// An empty phase list means every phase.
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(project_id) = &self.project_id {
            if event.project_id.as_ref() != Some(project_id) {
                return false;
            }
        }
        if let Some(source) = &self.source {
            if &event.source != source {
                return false;
            }
        }
        self.worker_phases.is_empty() || self.worker_phases.contains(&event.phase())
    }
}

/// Count returned by bulk cancel and delete
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkResult {
    pub count: usize,
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
