// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Projects and their event subscriptions

use crate::event::{Event, Labels};
use crate::id::ProjectId;
use crate::worker::WorkerSpec;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Subscription type that matches every event type
pub const ANY_TYPE: &str = "*";

/// A Project's declaration of which Events it wants to handle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSubscription {
    pub source: String,
    pub types: Vec<String>,
    #[serde(default)]
    pub labels: Labels,
}

impl EventSubscription {
    /// Source must match exactly, the type must be listed (or `*`), and
    /// every subscription label must be present on the Event with the same
    /// value. Extra Event labels are ignored.
    pub fn matches(&self, event: &Event) -> bool {
        self.source == event.source
            && self
                .types
                .iter()
                .any(|t| t == ANY_TYPE || *t == event.event_type)
            && self
                .labels
                .iter()
                .all(|(key, value)| event.labels.get(key) == Some(value))
    }
}

/// Isolation metadata assigned by the cluster substrate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KubernetesConfig {
    pub namespace: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSpec {
    #[serde(default)]
    pub event_subscriptions: Vec<EventSubscription>,
    #[serde(default)]
    pub worker_template: WorkerSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub spec: ProjectSpec,
    /// Assigned once at creation; carried forward across updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes: Option<KubernetesConfig>,
}

impl Project {
    pub fn new(id: impl Into<ProjectId>, spec: ProjectSpec) -> Self {
        Self {
            id: id.into(),
            spec,
            ..Default::default()
        }
    }

    /// True if any subscription matches.
    pub fn subscribes_to(&self, event: &Event) -> bool {
        self.spec
            .event_subscriptions
            .iter()
            .any(|sub| sub.matches(event))
    }

    pub fn namespace(&self) -> Option<&str> {
        self.kubernetes.as_ref().map(|k| k.namespace.as_str())
    }
}

#[cfg(test)]
#[path = "project_tests.rs"]
mod tests;
