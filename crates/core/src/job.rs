// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Jobs spawned by a Worker

use crate::worker::ContainerSpec;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobPhase {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
    Aborted,
    TimedOut,
    Unknown,
}

impl JobPhase {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobPhase::Pending | JobPhase::Running)
    }

    fn rank(self) -> u8 {
        match self {
            JobPhase::Pending => 0,
            JobPhase::Running => 1,
            _ => 2,
        }
    }

    /// Same forward-only rule as Worker phases.
    pub fn can_transition_to(self, next: JobPhase) -> bool {
        !self.is_terminal() && next.rank() >= self.rank()
    }
}

impl std::fmt::Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            JobPhase::Pending => "PENDING",
            JobPhase::Running => "RUNNING",
            JobPhase::Succeeded => "SUCCEEDED",
            JobPhase::Failed => "FAILED",
            JobPhase::Aborted => "ABORTED",
            JobPhase::TimedOut => "TIMED_OUT",
            JobPhase::Unknown => "UNKNOWN",
        })
    }
}

/// A container in a Job, with the substrate features it asks for
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobContainerSpec {
    #[serde(flatten)]
    pub container: ContainerSpec,
    #[serde(default)]
    pub working_directory: String,
    #[serde(default)]
    pub use_workspace: bool,
    #[serde(default)]
    pub workspace_mount_path: String,
    #[serde(default)]
    pub use_source: bool,
    #[serde(default)]
    pub source_mount_path: String,
    #[serde(default)]
    pub privileged: bool,
    #[serde(default)]
    pub use_host_docker_socket: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobHost {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(default)]
    pub node_selector: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSpec {
    pub primary_container: JobContainerSpec,
    #[serde(default)]
    pub sidecar_containers: BTreeMap<String, JobContainerSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<JobHost>,
}

/// Substrate features a Job needs, OR-ed across all of its containers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContainerFeatures {
    pub workspace: bool,
    pub source: bool,
    pub docker_socket: bool,
    pub privileged: bool,
}

impl ContainerFeatures {
    fn of(container: &JobContainerSpec) -> Self {
        Self {
            workspace: container.use_workspace,
            source: container.use_source,
            docker_socket: container.use_host_docker_socket,
            privileged: container.privileged,
        }
    }

    fn union(self, other: Self) -> Self {
        Self {
            workspace: self.workspace || other.workspace,
            source: self.source || other.source,
            docker_socket: self.docker_socket || other.docker_socket,
            privileged: self.privileged || other.privileged,
        }
    }
}

impl JobSpec {
    /// The primary container followed by sidecars in name order.
    pub fn containers(&self) -> impl Iterator<Item = &JobContainerSpec> {
        std::iter::once(&self.primary_container).chain(self.sidecar_containers.values())
    }

    /// If any container requests a feature, the Job as a whole gets it.
    ///
    /// Policy checks at creation and pod construction at start both read
    /// this, so they always agree.
    pub fn features(&self) -> ContainerFeatures {
        self.containers()
            .map(ContainerFeatures::of)
            .fold(ContainerFeatures::default(), ContainerFeatures::union)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    pub phase: JobPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    pub spec: JobSpec,
    #[serde(default)]
    pub status: JobStatus,
    /// Set once the substrate accepted the dispatch.
    #[serde(default)]
    pub scheduled: bool,
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
